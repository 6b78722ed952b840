use std::fmt;

/// Shader stage kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub const ALL: [StageKind; 2] = [StageKind::Vertex, StageKind::Fragment];

    #[inline]
    pub const fn label(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
        }
    }

    /// Dense index, usable for per-stage arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            StageKind::Vertex => 0,
            StageKind::Fragment => 1,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Primitive topology for `draw_arrays`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    Lines,
    Points,
}

/// Vertex attribute slot resolved on a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttribLocation(pub u32);

/// Uniform slot resolved on a linked program.
///
/// Only meaningful for the program it was resolved on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// Float attribute layout inside the bound array buffer.
///
/// `stride == 0` means tightly packed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttribLayout {
    /// Floats per vertex (1..=4).
    pub components: u8,
    pub normalized: bool,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u32,
}

impl AttribLayout {
    /// Tightly packed, unnormalized floats starting at offset 0.
    #[inline]
    pub const fn packed(components: u8) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Effective stride in bytes.
    #[inline]
    pub const fn effective_stride(self) -> u32 {
        if self.stride == 0 {
            self.components as u32 * 4
        } else {
            self.stride
        }
    }
}
