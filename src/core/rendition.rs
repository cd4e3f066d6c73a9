//! Graphic rendition
//!
//! The "pen" the terminal prints with. It is a plain value: printing copies
//! it into the cell, so cells never refer back to a shared rendition.

use serde::{Deserialize, Serialize};

use super::attributes::ExternalAttribute;
use super::cell::{Cell, CellFlags, UnderlineStyle};
use super::color::Color;

/// Current text attributes and colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicRendition {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    /// Underline and its style, `None` when not underlined
    pub underline: Option<UnderlineStyle>,
    pub blink: bool,
    pub strikethrough: bool,
    pub reversed: bool,
    pub invisible: bool,
    pub fg: Color,
    pub bg: Color,
    /// Underline color distinct from the foreground
    pub underline_color: Option<Color>,
    /// Active hyperlink (OSC 8); not touched by SGR 0
    pub hyperlink_id: Option<u32>,
    /// Open shell-integration block (OSC 1337 Block); not touched by SGR 0
    pub block_id: Option<u32>,
}

impl GraphicRendition {
    pub fn new() -> Self {
        Self::default()
    }

    /// SGR 0: everything but the hyperlink and block goes back to default
    pub fn reset_sgr(&mut self) {
        *self = Self {
            hyperlink_id: self.hyperlink_id,
            block_id: self.block_id,
            ..Self::default()
        };
    }

    fn flags(&self) -> CellFlags {
        let mut flags = CellFlags::empty();
        flags.set(CellFlags::BOLD, self.bold);
        flags.set(CellFlags::FAINT, self.faint);
        flags.set(CellFlags::ITALIC, self.italic);
        flags.set(CellFlags::UNDERLINE, self.underline.is_some());
        flags.set(CellFlags::BLINK, self.blink);
        flags.set(CellFlags::STRIKETHROUGH, self.strikethrough);
        flags.set(CellFlags::INVERSE, self.reversed);
        flags.set(CellFlags::INVISIBLE, self.invisible);
        flags
    }

    /// Never-written cell carrying these attributes, used as the print template
    pub fn template(&self) -> Cell {
        Cell {
            code: 0,
            fg: self.fg,
            bg: self.bg,
            flags: self.flags(),
            underline: self.underline.unwrap_or_default(),
            external: 0,
        }
    }

    /// Cell written when erasing: blank, with the current background
    pub fn erase_cell(&self) -> Cell {
        self.template().blank()
    }

    /// Attributes that go into the line's external attribute index
    pub fn external_attribute(&self) -> ExternalAttribute {
        ExternalAttribute {
            underline_color: self.underline_color,
            hyperlink_id: self.hyperlink_id,
            block_id: self.block_id,
            control_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_flags() {
        let rendition = GraphicRendition {
            bold: true,
            underline: Some(UnderlineStyle::Double),
            fg: Color::Indexed(2),
            ..Default::default()
        };
        let cell = rendition.template();
        assert!(cell.flags.contains(CellFlags::BOLD | CellFlags::UNDERLINE));
        assert_eq!(cell.underline, UnderlineStyle::Double);
        assert_eq!(cell.fg, Color::Indexed(2));
        assert_eq!(cell.code, 0);
    }

    #[test]
    fn test_reset_keeps_hyperlink() {
        let mut rendition = GraphicRendition {
            bold: true,
            hyperlink_id: Some(3),
            block_id: Some(1),
            ..Default::default()
        };
        rendition.reset_sgr();
        assert!(!rendition.bold);
        assert_eq!(rendition.hyperlink_id, Some(3));
        assert_eq!(rendition.block_id, Some(1));
    }

    #[test]
    fn test_external_attribute_carries_block() {
        let rendition = GraphicRendition {
            underline_color: Some(Color::Indexed(5)),
            block_id: Some(2),
            ..Default::default()
        };
        let attr = rendition.external_attribute();
        assert_eq!(attr.block_id, Some(2));
        assert_eq!(attr.underline_color, Some(Color::Indexed(5)));
        assert_eq!(attr.control_code, None);
        assert!(GraphicRendition::new().external_attribute().is_empty());
    }

    #[test]
    fn test_erase_cell_keeps_background_only() {
        let rendition = GraphicRendition {
            bold: true,
            fg: Color::Indexed(1),
            bg: Color::Indexed(4),
            ..Default::default()
        };
        let cell = rendition.erase_cell();
        assert!(cell.is_empty());
        assert_eq!(cell.bg, Color::Indexed(4));
        assert_eq!(cell.fg, Color::Default);
        assert!(cell.flags.is_empty());
    }
}
