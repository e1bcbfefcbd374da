//! Frame graph: the fixed sequence of render passes for one frame
//!
//! The composition order is fixed by data dependency: geometry raster pass →
//! compute-composite pass → ordered high-resolution post passes → tonemap
//! pass (the mandatory 32-bit→8-bit conversion) → ordered low-resolution
//! post passes → final composite onto the swapchain image → UI overlay pass.
//!
//! This module is the backend-agnostic description: node list, per-node
//! layout contract, and the ping-pong read/write schedule. The Vulkan
//! backend realizes the description against actual render passes and
//! framebuffers. Validation here catches configuration defects (wrong order,
//! missing tonemap, unsupported layout transition, a pass sampling its own
//! output) before any GPU object exists.

use crate::config::PostProcessConfig;
use crate::error::{Error, Result};
use super::formats::{check_transition, ImageLayout, TextureFormat};

/// Role of a pass within the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Scene rasterization into the high-precision color target
    Geometry,
    /// Fullscreen pass compositing the compute output over the scene color
    ComputeComposite,
    /// One configurable post-process stage
    PostProcess,
    /// Mandatory high-precision → 8-bit conversion
    Tonemap,
    /// Final copy onto the swapchain image
    FinalComposite,
    /// UI overlay drawn over the composited frame
    UiOverlay,
}

/// Resolution class of a pass's render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassResolution {
    /// Swapchain resolution
    Full,
    /// Half resolution (post-tonemap stages)
    Low,
}

/// One render pass declaration.
///
/// `color_format == None` means the pass renders to the swapchain image
/// (format decided at runtime). `initial_layout`/`final_layout` are the
/// attachment layout contract at pass entry/exit.
#[derive(Debug, Clone, PartialEq)]
pub struct PassNode {
    pub name: String,
    pub kind: PassKind,
    pub color_format: Option<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
    pub resolution: PassResolution,
}

/// Where a pass samples its primary input from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSource {
    /// No sampled input (geometry raster, UI overlay)
    None,
    /// The geometry pass color output
    GeometryColor,
    /// One of the two high-resolution ping-pong targets
    HighRes(usize),
    /// The tonemap output target
    TonemapOutput,
    /// One of the two low-resolution ping-pong targets
    LowRes(usize),
}

/// Where a pass writes its color output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    GeometryColor,
    HighRes(usize),
    TonemapOutput,
    LowRes(usize),
    SwapchainImage,
}

/// Resolved input/output of one scheduled pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassIo {
    pub source: PassSource,
    pub target: PassTarget,
}

/// The complete, ordered frame graph
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGraph {
    nodes: Vec<PassNode>,
}

impl FrameGraph {
    /// Build the standard frame graph from the post-process configuration.
    ///
    /// High-resolution stages run on the 32-bit float targets before tonemap;
    /// low-resolution stages run on the 8-bit targets after it. The geometry,
    /// compute-composite, tonemap, final-composite, and UI passes are always
    /// present.
    pub fn standard(post: &PostProcessConfig) -> Self {
        let mut nodes = Vec::with_capacity(
            5 + post.high_res_stages.len() + post.low_res_stages.len(),
        );

        nodes.push(PassNode {
            name: "geometry".to_string(),
            kind: PassKind::Geometry,
            color_format: Some(TextureFormat::R32G32B32A32_SFLOAT),
            depth_format: Some(TextureFormat::D32_SFLOAT),
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
            resolution: PassResolution::Full,
        });

        nodes.push(PassNode {
            name: "compute_composite".to_string(),
            kind: PassKind::ComputeComposite,
            color_format: Some(TextureFormat::R32G32B32A32_SFLOAT),
            depth_format: None,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
            resolution: PassResolution::Full,
        });

        for stage in &post.high_res_stages {
            nodes.push(PassNode {
                name: stage.clone(),
                kind: PassKind::PostProcess,
                color_format: Some(TextureFormat::R32G32B32A32_SFLOAT),
                depth_format: None,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::ShaderReadOnly,
                resolution: PassResolution::Full,
            });
        }

        nodes.push(PassNode {
            name: "tonemap".to_string(),
            kind: PassKind::Tonemap,
            color_format: Some(TextureFormat::R8G8B8A8_UNORM),
            depth_format: None,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
            resolution: PassResolution::Full,
        });

        for stage in &post.low_res_stages {
            nodes.push(PassNode {
                name: stage.clone(),
                kind: PassKind::PostProcess,
                color_format: Some(TextureFormat::R8G8B8A8_UNORM),
                depth_format: None,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::ShaderReadOnly,
                resolution: PassResolution::Low,
            });
        }

        nodes.push(PassNode {
            name: "final_composite".to_string(),
            kind: PassKind::FinalComposite,
            color_format: None,
            depth_format: None,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ColorAttachment,
            resolution: PassResolution::Full,
        });

        nodes.push(PassNode {
            name: "ui_overlay".to_string(),
            kind: PassKind::UiOverlay,
            color_format: None,
            depth_format: None,
            initial_layout: ImageLayout::ColorAttachment,
            final_layout: ImageLayout::PresentSrc,
            resolution: PassResolution::Full,
        });

        Self { nodes }
    }

    /// All nodes in execution order
    pub fn nodes(&self) -> &[PassNode] {
        &self.nodes
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&PassNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Resolve the read/write targets of every node, in execution order.
    ///
    /// The compute-composite pass opens the high-resolution ping-pong chain
    /// by writing target 0; each post pass reads what the previous pass
    /// wrote and writes the other target, so no pass ever samples the image
    /// it is rendering to.
    pub fn schedule(&self) -> Vec<PassIo> {
        let mut schedule = Vec::with_capacity(self.nodes.len());
        let mut high_written = 0usize;
        let mut low_written: Option<usize> = None;

        for node in &self.nodes {
            let io = match node.kind {
                PassKind::Geometry => PassIo {
                    source: PassSource::None,
                    target: PassTarget::GeometryColor,
                },
                PassKind::ComputeComposite => {
                    high_written = 0;
                    PassIo {
                        source: PassSource::GeometryColor,
                        target: PassTarget::HighRes(0),
                    }
                }
                PassKind::PostProcess if node.resolution == PassResolution::Full => {
                    let read = high_written;
                    high_written = 1 - high_written;
                    PassIo {
                        source: PassSource::HighRes(read),
                        target: PassTarget::HighRes(high_written),
                    }
                }
                PassKind::Tonemap => PassIo {
                    source: PassSource::HighRes(high_written),
                    target: PassTarget::TonemapOutput,
                },
                PassKind::PostProcess => {
                    let source = match low_written {
                        None => PassSource::TonemapOutput,
                        Some(index) => PassSource::LowRes(index),
                    };
                    let write = low_written.map(|index| 1 - index).unwrap_or(0);
                    low_written = Some(write);
                    PassIo {
                        source,
                        target: PassTarget::LowRes(write),
                    }
                }
                PassKind::FinalComposite => PassIo {
                    source: match low_written {
                        None => PassSource::TonemapOutput,
                        Some(index) => PassSource::LowRes(index),
                    },
                    target: PassTarget::SwapchainImage,
                },
                PassKind::UiOverlay => PassIo {
                    source: PassSource::None,
                    target: PassTarget::SwapchainImage,
                },
            };
            schedule.push(io);
        }

        schedule
    }

    /// Validate the graph against the fixed composition template.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for any violation: wrong pass order,
    /// missing/duplicate singleton pass, duplicate names, format discipline
    /// (high-precision before tonemap, 8-bit after), unsupported layout
    /// transitions, or a pass that samples its own render target.
    pub fn validate(&self) -> Result<()> {
        self.validate_order()?;
        self.validate_names()?;
        self.validate_formats()?;
        self.validate_layouts()?;
        self.validate_schedule()?;
        Ok(())
    }

    fn validate_order(&self) -> Result<()> {
        // The kind sequence must match:
        // Geometry, ComputeComposite, PostProcess*(Full), Tonemap,
        // PostProcess*(Low), FinalComposite, UiOverlay
        fn expect<'a>(
            iter: &mut std::iter::Peekable<std::slice::Iter<'a, PassNode>>,
            kind: PassKind,
        ) -> Result<()> {
            match iter.next() {
                Some(node) if node.kind == kind => Ok(()),
                Some(node) => Err(Error::Configuration(format!(
                    "Frame graph order violation: expected {:?}, found {:?} ('{}')",
                    kind, node.kind, node.name
                ))),
                None => Err(Error::Configuration(format!(
                    "Frame graph order violation: missing {:?} pass",
                    kind
                ))),
            }
        }

        let mut iter = self.nodes.iter().peekable();

        expect(&mut iter, PassKind::Geometry)?;
        expect(&mut iter, PassKind::ComputeComposite)?;

        while matches!(iter.peek(), Some(n) if n.kind == PassKind::PostProcess && n.resolution == PassResolution::Full) {
            iter.next();
        }

        expect(&mut iter, PassKind::Tonemap)?;

        while matches!(iter.peek(), Some(n) if n.kind == PassKind::PostProcess && n.resolution == PassResolution::Low) {
            iter.next();
        }

        expect(&mut iter, PassKind::FinalComposite)?;
        expect(&mut iter, PassKind::UiOverlay)?;

        if let Some(extra) = iter.next() {
            return Err(Error::Configuration(format!(
                "Frame graph order violation: unexpected trailing pass '{}'",
                extra.name
            )));
        }
        Ok(())
    }

    fn validate_names(&self) -> Result<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            if node.name.is_empty() {
                return Err(Error::Configuration(format!(
                    "Frame graph node {} has an empty name",
                    i
                )));
            }
            if self.nodes[..i].iter().any(|other| other.name == node.name) {
                return Err(Error::Configuration(format!(
                    "Frame graph contains duplicate pass name '{}'",
                    node.name
                )));
            }
        }
        Ok(())
    }

    fn validate_formats(&self) -> Result<()> {
        let mut seen_tonemap = false;
        for node in &self.nodes {
            match node.kind {
                PassKind::Tonemap => {
                    seen_tonemap = true;
                    match node.color_format {
                        Some(format) if !format.is_high_precision() && !format.is_depth() => {}
                        other => {
                            return Err(Error::Configuration(format!(
                                "Tonemap pass must write an 8-bit color format, got {:?}",
                                other
                            )));
                        }
                    }
                }
                PassKind::Geometry | PassKind::ComputeComposite | PassKind::PostProcess => {
                    let format = node.color_format.ok_or_else(|| {
                        Error::Configuration(format!(
                            "Pass '{}' must declare a color format",
                            node.name
                        ))
                    })?;
                    if !seen_tonemap && !format.is_high_precision() {
                        return Err(Error::Configuration(format!(
                            "Pass '{}' runs before tonemap and must use a high-precision format, got {:?}",
                            node.name, format
                        )));
                    }
                    if seen_tonemap && format.is_high_precision() {
                        return Err(Error::Configuration(format!(
                            "Pass '{}' runs after tonemap and must use an 8-bit format, got {:?}",
                            node.name, format
                        )));
                    }
                }
                PassKind::FinalComposite | PassKind::UiOverlay => {
                    // Swapchain format, decided at runtime
                    if node.color_format.is_some() {
                        return Err(Error::Configuration(format!(
                            "Pass '{}' renders to the swapchain and must not pin a color format",
                            node.name
                        )));
                    }
                }
            }
            if node.depth_format.is_some() && node.kind != PassKind::Geometry {
                return Err(Error::Configuration(format!(
                    "Pass '{}' must not declare a depth attachment",
                    node.name
                )));
            }
        }
        Ok(())
    }

    fn validate_layouts(&self) -> Result<()> {
        for node in &self.nodes {
            // Entry: initial layout -> color-attachment write
            if node.initial_layout != ImageLayout::ColorAttachment {
                check_transition(node.initial_layout, ImageLayout::ColorAttachment)?;
            }
            // Exit: color-attachment write -> final layout
            if node.final_layout != ImageLayout::ColorAttachment {
                check_transition(ImageLayout::ColorAttachment, node.final_layout)?;
            }
        }
        Ok(())
    }

    fn validate_schedule(&self) -> Result<()> {
        let schedule = self.schedule();
        let mut previous_target: Option<PassTarget> = None;

        for (node, io) in self.nodes.iter().zip(&schedule) {
            // A pass never samples the image it renders to
            let conflict = matches!(
                (io.source, io.target),
                (PassSource::HighRes(a), PassTarget::HighRes(b)) if a == b
            ) || matches!(
                (io.source, io.target),
                (PassSource::LowRes(a), PassTarget::LowRes(b)) if a == b
            );
            if conflict {
                return Err(Error::Configuration(format!(
                    "Pass '{}' reads and writes the same ping-pong target",
                    node.name
                )));
            }

            // Each consumer reads what the previous producer wrote
            if let (Some(previous), source) = (previous_target, io.source) {
                let expected = match previous {
                    PassTarget::GeometryColor => PassSource::GeometryColor,
                    PassTarget::HighRes(i) => PassSource::HighRes(i),
                    PassTarget::TonemapOutput => PassSource::TonemapOutput,
                    PassTarget::LowRes(i) => PassSource::LowRes(i),
                    PassTarget::SwapchainImage => PassSource::None,
                };
                if source != PassSource::None && source != expected {
                    return Err(Error::Configuration(format!(
                        "Pass '{}' does not consume the previous pass's output ({:?} != {:?})",
                        node.name, source, expected
                    )));
                }
            }
            previous_target = Some(io.target);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
