use crate::descriptor::{ParentRef, RectDescriptor};
use bitflags::bitflags;
use glam::Vec2;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LayoutFlags: u8 {
        const CHILD_CONTROL_WIDTH = 1 << 0;
        const CHILD_CONTROL_HEIGHT = 1 << 1;
        const FORCE_EXPAND_WIDTH = 1 << 2;
        const FORCE_EXPAND_HEIGHT = 1 << 3;
        const REVERSE = 1 << 4;
    }
}

impl LayoutFlags {
    /// Accepts both the long and short document spellings.
    pub fn from_key(name: &str) -> Option<Self> {
        let flag = match name.to_ascii_lowercase().as_str() {
            "child_control_width" | "control_width" => LayoutFlags::CHILD_CONTROL_WIDTH,
            "child_control_height" | "control_height" => LayoutFlags::CHILD_CONTROL_HEIGHT,
            "force_expand_width" | "expand_width" => LayoutFlags::FORCE_EXPAND_WIDTH,
            "force_expand_height" | "expand_height" => LayoutFlags::FORCE_EXPAND_HEIGHT,
            "reverse" => LayoutFlags::REVERSE,
            _ => return None,
        };
        Some(flag)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl Alignment {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().replace(|ch: char| matches!(ch, '_' | '-' | ' '), "").as_str() {
            "uppercenter" | "top" | "topcenter" => Alignment::UpperCenter,
            "upperright" | "topright" => Alignment::UpperRight,
            "middleleft" | "left" => Alignment::MiddleLeft,
            "middlecenter" | "center" | "middle" => Alignment::MiddleCenter,
            "middleright" | "right" => Alignment::MiddleRight,
            "lowerleft" | "bottomleft" => Alignment::LowerLeft,
            "lowercenter" | "bottom" | "bottomcenter" => Alignment::LowerCenter,
            "lowerright" | "bottomright" => Alignment::LowerRight,
            _ => Alignment::UpperLeft,
        }
    }

    /// Fraction of the free space placed before the content on each axis.
    fn bias(self) -> Vec2 {
        let x = match self {
            Alignment::UpperLeft | Alignment::MiddleLeft | Alignment::LowerLeft => 0.0,
            Alignment::UpperCenter | Alignment::MiddleCenter | Alignment::LowerCenter => 0.5,
            Alignment::UpperRight | Alignment::MiddleRight | Alignment::LowerRight => 1.0,
        };
        let y = match self {
            Alignment::UpperLeft | Alignment::UpperCenter | Alignment::UpperRight => 0.0,
            Alignment::MiddleLeft | Alignment::MiddleCenter | Alignment::MiddleRight => 0.5,
            Alignment::LowerLeft | Alignment::LowerCenter | Alignment::LowerRight => 1.0,
        };
        Vec2::new(x, y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayoutKind {
    Grid { columns: u32, cell_size: Vec2 },
    Horizontal,
    Vertical,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutDescriptor {
    pub name: String,
    pub kind: LayoutKind,
    pub rect: RectDescriptor,
    pub parent: ParentRef,
    pub spacing: Vec2,
    pub padding: f32,
    pub flags: LayoutFlags,
    pub alignment: Alignment,
    pub scrollable: bool,
}

/// Placement computed for one child, in the layout's local space with the
/// origin at its top-left corner and y growing downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub position: Vec2,
    pub size: Vec2,
}

impl LayoutDescriptor {
    pub fn new(name: impl Into<String>, kind: LayoutKind) -> Self {
        Self {
            name: name.into(),
            kind,
            rect: RectDescriptor::default(),
            parent: ParentRef::Root,
            spacing: Vec2::ZERO,
            padding: 0.0,
            flags: LayoutFlags::empty(),
            alignment: Alignment::UpperLeft,
            scrollable: false,
        }
    }

    pub fn with_spacing(mut self, spacing: Vec2) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_rect(mut self, rect: RectDescriptor) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_flags(mut self, flags: LayoutFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Places children of the given preferred sizes, in order.
    pub fn arrange(&self, sizes: &[Vec2]) -> Vec<Slot> {
        let inner = (self.rect.size - Vec2::splat(self.padding * 2.0)).max(Vec2::ZERO);
        let origin = Vec2::splat(self.padding);
        let mut slots = match &self.kind {
            LayoutKind::Vertical => self.stack(sizes, inner, true),
            LayoutKind::Horizontal => self.stack(sizes, inner, false),
            LayoutKind::Grid { columns, cell_size } => self.grid(sizes.len(), (*columns).max(1), *cell_size, inner),
        };
        for slot in slots.iter_mut() {
            slot.position += origin;
        }
        if self.flags.contains(LayoutFlags::REVERSE) {
            let positions: Vec<Vec2> = slots.iter().rev().map(|slot| slot.position).collect();
            for (slot, position) in slots.iter_mut().zip(positions) {
                slot.position = position;
            }
        }
        slots
    }

    fn stack(&self, sizes: &[Vec2], inner: Vec2, vertical: bool) -> Vec<Slot> {
        let count = sizes.len();
        if count == 0 {
            return Vec::new();
        }
        let gap = if vertical { self.spacing.y } else { self.spacing.x };
        let total_gap = gap * (count.saturating_sub(1)) as f32;
        let main_extent = if vertical { inner.y } else { inner.x };
        let expand_main = if vertical {
            self.flags.contains(LayoutFlags::FORCE_EXPAND_HEIGHT)
        } else {
            self.flags.contains(LayoutFlags::FORCE_EXPAND_WIDTH)
        };
        let control_cross = if vertical {
            self.flags.contains(LayoutFlags::CHILD_CONTROL_WIDTH)
        } else {
            self.flags.contains(LayoutFlags::CHILD_CONTROL_HEIGHT)
        };
        let shared = ((main_extent - total_gap) / count as f32).max(0.0);
        let mut sized: Vec<Vec2> = sizes
            .iter()
            .map(|size| {
                let mut size = *size;
                if vertical {
                    if expand_main {
                        size.y = shared;
                    }
                    if control_cross {
                        size.x = inner.x;
                    }
                } else {
                    if expand_main {
                        size.x = shared;
                    }
                    if control_cross {
                        size.y = inner.y;
                    }
                }
                size
            })
            .collect();
        let content: f32 = sized.iter().map(|s| if vertical { s.y } else { s.x }).sum::<f32>() + total_gap;
        let bias = self.alignment.bias();
        let free_main = (main_extent - content).max(0.0);
        let mut cursor = free_main * if vertical { bias.y } else { bias.x };
        let mut slots = Vec::with_capacity(count);
        for size in sized.drain(..) {
            let (cross_extent, cross_size, cross_bias) =
                if vertical { (inner.x, size.x, bias.x) } else { (inner.y, size.y, bias.y) };
            let cross = (cross_extent - cross_size).max(0.0) * cross_bias;
            let position = if vertical { Vec2::new(cross, cursor) } else { Vec2::new(cursor, cross) };
            cursor += if vertical { size.y } else { size.x } + gap;
            slots.push(Slot { position, size });
        }
        slots
    }

    fn grid(&self, count: usize, columns: u32, cell_size: Vec2, inner: Vec2) -> Vec<Slot> {
        let columns = columns as usize;
        let used_columns = count.min(columns).max(1);
        let width = used_columns as f32 * cell_size.x + (used_columns - 1) as f32 * self.spacing.x;
        let offset_x = (inner.x - width).max(0.0) * self.alignment.bias().x;
        (0..count)
            .map(|index| {
                let column = (index % columns) as f32;
                let row = (index / columns) as f32;
                let position = Vec2::new(
                    offset_x + column * (cell_size.x + self.spacing.x),
                    row * (cell_size.y + self.spacing.y),
                );
                Slot { position, size: cell_size }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(kind: LayoutKind, size: Vec2) -> LayoutDescriptor {
        LayoutDescriptor::new("l", kind).with_rect(RectDescriptor::at(Vec2::ZERO, size))
    }

    #[test]
    fn flag_keys_accept_short_spellings() {
        assert_eq!(LayoutFlags::from_key("expand_width"), Some(LayoutFlags::FORCE_EXPAND_WIDTH));
        assert_eq!(LayoutFlags::from_key("Child_Control_Height"), Some(LayoutFlags::CHILD_CONTROL_HEIGHT));
        assert_eq!(LayoutFlags::from_key("spacing"), None);
    }

    #[test]
    fn vertical_stack_uses_spacing() {
        let layout = sized(LayoutKind::Vertical, Vec2::new(200.0, 400.0)).with_spacing(Vec2::new(0.0, 10.0));
        let slots = layout.arrange(&[Vec2::new(50.0, 20.0), Vec2::new(50.0, 30.0), Vec2::new(50.0, 20.0)]);
        let ys: Vec<f32> = slots.iter().map(|s| s.position.y).collect();
        assert_eq!(ys, vec![0.0, 30.0, 70.0]);
    }

    #[test]
    fn child_control_width_fills_cross_axis() {
        let layout = sized(LayoutKind::Vertical, Vec2::new(200.0, 400.0))
            .with_flags(LayoutFlags::CHILD_CONTROL_WIDTH | LayoutFlags::FORCE_EXPAND_HEIGHT);
        let slots = layout.arrange(&[Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0)]);
        assert!(slots.iter().all(|s| s.size == Vec2::new(200.0, 200.0)));
    }

    #[test]
    fn grid_wraps_after_columns() {
        let layout = sized(LayoutKind::Grid { columns: 2, cell_size: Vec2::splat(40.0) }, Vec2::splat(80.0));
        let slots = layout.arrange(&[Vec2::ZERO; 3]);
        assert_eq!(slots[2].position, Vec2::new(0.0, 40.0));
        assert_eq!(slots[1].position, Vec2::new(40.0, 0.0));
    }

    #[test]
    fn empty_layout_is_valid() {
        assert!(sized(LayoutKind::Horizontal, Vec2::splat(10.0)).arrange(&[]).is_empty());
    }
}
