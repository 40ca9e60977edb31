//! Descriptor layouts and per-image descriptor sets for the demo scenes.

use ash::vk;
use tracing::debug;

use vkframe_rhi::RhiResult;
use vkframe_rhi::buffer::Buffer;
use vkframe_rhi::descriptor::{
    DescriptorBindingBuilder, DescriptorPool, DescriptorSetLayout, buffer_info, image_info,
    update_descriptor_sets,
};
use vkframe_rhi::device::Device;
use vkframe_rhi::texture::{Sampler, Texture};

/// MVP uniform block at binding 0, sampled texture at binding 1.
pub fn textured_layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 2] {
    [
        DescriptorBindingBuilder::uniform_buffer(0, vk::ShaderStageFlags::VERTEX),
        DescriptorBindingBuilder::combined_image_sampler(1, vk::ShaderStageFlags::FRAGMENT),
    ]
}

/// Model/view block at binding 0, projection block at binding 1.
pub fn two_uniform_layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 2] {
    [
        DescriptorBindingBuilder::uniform_buffer(0, vk::ShaderStageFlags::VERTEX),
        DescriptorBindingBuilder::uniform_buffer(1, vk::ShaderStageFlags::VERTEX),
    ]
}

/// One descriptor write within a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetWrite {
    /// The image's `buffer`-th uniform buffer.
    Uniform { binding: u32, buffer: usize },
    /// The shared texture and sampler.
    Texture { binding: u32 },
}

/// Writes for one set: uniform buffers on bindings `0..uniform_count`, then
/// the texture on the next binding if there is one.
pub fn write_plan(uniform_count: usize, textured: bool) -> Vec<SetWrite> {
    let mut plan: Vec<SetWrite> = (0..uniform_count)
        .map(|buffer| SetWrite::Uniform {
            binding: buffer as u32,
            buffer,
        })
        .collect();

    if textured {
        plan.push(SetWrite::Texture {
            binding: uniform_count as u32,
        });
    }

    plan
}

/// Allocates one set per swapchain image from `pool` and writes each once.
///
/// `per_image_buffers[i]` are image `i`'s uniform buffers in binding order.
pub fn allocate_and_write_sets(
    device: &Device,
    pool: &DescriptorPool,
    layout: &DescriptorSetLayout,
    per_image_buffers: &[Vec<Buffer>],
    texture: Option<(&Texture, &Sampler)>,
) -> RhiResult<Vec<vk::DescriptorSet>> {
    let layouts = vec![layout.handle(); per_image_buffers.len()];
    let sets = pool.allocate(&layouts)?;

    let image_infos = texture.map(|(texture, sampler)| {
        [image_info(
            sampler.handle(),
            texture.view(),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )]
    });

    for (&set, buffers) in sets.iter().zip(per_image_buffers) {
        let buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = buffers
            .iter()
            .map(|b| [buffer_info(b.handle(), 0, b.size())])
            .collect();

        let writes: Vec<vk::WriteDescriptorSet> = write_plan(buffers.len(), texture.is_some())
            .into_iter()
            .filter_map(|write| match write {
                SetWrite::Uniform { binding, buffer } => Some(
                    vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding)
                        .dst_array_element(0)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&buffer_infos[buffer]),
                ),
                SetWrite::Texture { binding } => image_infos.as_ref().map(|info| {
                    vk::WriteDescriptorSet::default()
                        .dst_set(set)
                        .dst_binding(binding)
                        .dst_array_element(0)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(info)
                }),
            })
            .collect();

        update_descriptor_sets(device, &writes);
    }

    debug!(
        "Wrote {} descriptor set(s){}",
        sets.len(),
        if texture.is_some() { " with texture" } else { "" }
    );

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkframe_rhi::descriptor::exact_pool_sizes;

    #[test]
    fn test_textured_layout() {
        let bindings = textured_layout_bindings();

        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);

        assert_eq!(bindings[1].binding, 1);
        assert_eq!(
            bindings[1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_two_uniform_layout() {
        let bindings = two_uniform_layout_bindings();
        assert!(
            bindings
                .iter()
                .all(|b| b.descriptor_type == vk::DescriptorType::UNIFORM_BUFFER)
        );
        assert_eq!([bindings[0].binding, bindings[1].binding], [0, 1]);
    }

    #[test]
    fn test_textured_pool_for_three_images() {
        let counts: Vec<_> = textured_layout_bindings()
            .iter()
            .map(|b| (b.descriptor_type, b.descriptor_count))
            .collect();
        let sizes = exact_pool_sizes(3, &counts);

        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 3);
        assert_eq!(sizes[1].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(sizes[1].descriptor_count, 3);
    }

    #[test]
    fn test_two_uniform_pool_merges_types() {
        let counts: Vec<_> = two_uniform_layout_bindings()
            .iter()
            .map(|b| (b.descriptor_type, b.descriptor_count))
            .collect();
        let sizes = exact_pool_sizes(2, &counts);

        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].descriptor_count, 4);
    }

    #[test]
    fn test_write_plan_textured() {
        assert_eq!(
            write_plan(1, true),
            vec![
                SetWrite::Uniform {
                    binding: 0,
                    buffer: 0
                },
                SetWrite::Texture { binding: 1 },
            ]
        );
    }

    #[test]
    fn test_write_plan_uniforms_only() {
        assert_eq!(
            write_plan(2, false),
            vec![
                SetWrite::Uniform {
                    binding: 0,
                    buffer: 0
                },
                SetWrite::Uniform {
                    binding: 1,
                    buffer: 1
                },
            ]
        );
        assert!(write_plan(0, false).is_empty());
    }
}
