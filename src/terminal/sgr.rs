//! Select Graphic Rendition
//!
//! `CSI ... m` is a left-to-right scan over the parameters. Plain codes map
//! to one effect through [`sgr_effect`]. Extended colors (38, 48, 58) take
//! arguments either as colon sub-parameters of the same parameter or as the
//! parameters that follow it; [`EXTENDED_COLOR_FORMS`] says how many
//! following parameters each semicolon form consumes.

use crate::core::{Color, GraphicRendition, UnderlineStyle};
use crate::parser::Params;

/// Semicolon extended color forms as `(selector, arguments)`:
/// `38;5;N` takes one argument, `38;2;R;G;B` takes three.
/// An unknown selector is dropped together with the code that introduced
/// it, so two parameters are consumed and scanning resumes after them.
pub const EXTENDED_COLOR_FORMS: &[(i64, usize)] = &[(5, 1), (2, 3)];

/// Effect of a plain SGR code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgrEffect {
    Reset,
    Bold,
    Faint,
    Italic,
    Underline(UnderlineStyle),
    Blink,
    Reversed,
    Invisible,
    Strikethrough,
    NormalIntensity,
    NotItalic,
    NotUnderlined,
    NotBlinking,
    NotReversed,
    Visible,
    NotStrikethrough,
    Foreground(Color),
    Background(Color),
    DefaultForeground,
    DefaultBackground,
    DefaultUnderlineColor,
}

/// The SGR code table
pub fn sgr_effect(code: i64) -> Option<SgrEffect> {
    let effect = match code {
        0 => SgrEffect::Reset,
        1 => SgrEffect::Bold,
        2 => SgrEffect::Faint,
        3 => SgrEffect::Italic,
        4 => SgrEffect::Underline(UnderlineStyle::Single),
        5 | 6 => SgrEffect::Blink,
        7 => SgrEffect::Reversed,
        8 => SgrEffect::Invisible,
        9 => SgrEffect::Strikethrough,
        21 => SgrEffect::Underline(UnderlineStyle::Double),
        22 => SgrEffect::NormalIntensity,
        23 => SgrEffect::NotItalic,
        24 => SgrEffect::NotUnderlined,
        25 => SgrEffect::NotBlinking,
        27 => SgrEffect::NotReversed,
        28 => SgrEffect::Visible,
        29 => SgrEffect::NotStrikethrough,
        30..=37 => SgrEffect::Foreground(Color::Indexed((code - 30) as u8)),
        39 => SgrEffect::DefaultForeground,
        40..=47 => SgrEffect::Background(Color::Indexed((code - 40) as u8)),
        49 => SgrEffect::DefaultBackground,
        59 => SgrEffect::DefaultUnderlineColor,
        90..=97 => SgrEffect::Foreground(Color::Indexed((code - 90 + 8) as u8)),
        100..=107 => SgrEffect::Background(Color::Indexed((code - 100 + 8) as u8)),
        _ => return None,
    };
    Some(effect)
}

impl SgrEffect {
    pub fn apply(self, r: &mut GraphicRendition) {
        match self {
            SgrEffect::Reset => r.reset_sgr(),
            SgrEffect::Bold => r.bold = true,
            SgrEffect::Faint => r.faint = true,
            SgrEffect::Italic => r.italic = true,
            SgrEffect::Underline(style) => r.underline = Some(style),
            SgrEffect::Blink => r.blink = true,
            SgrEffect::Reversed => r.reversed = true,
            SgrEffect::Invisible => r.invisible = true,
            SgrEffect::Strikethrough => r.strikethrough = true,
            SgrEffect::NormalIntensity => {
                r.bold = false;
                r.faint = false;
            }
            SgrEffect::NotItalic => r.italic = false,
            SgrEffect::NotUnderlined => r.underline = None,
            SgrEffect::NotBlinking => r.blink = false,
            SgrEffect::NotReversed => r.reversed = false,
            SgrEffect::Visible => r.invisible = false,
            SgrEffect::NotStrikethrough => r.strikethrough = false,
            SgrEffect::Foreground(color) => r.fg = color,
            SgrEffect::Background(color) => r.bg = color,
            SgrEffect::DefaultForeground => r.fg = Color::Default,
            SgrEffect::DefaultBackground => r.bg = Color::Default,
            SgrEffect::DefaultUnderlineColor => r.underline_color = None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ColorTarget {
    Foreground,
    Background,
    Underline,
}

impl ColorTarget {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            38 => Some(ColorTarget::Foreground),
            48 => Some(ColorTarget::Background),
            58 => Some(ColorTarget::Underline),
            _ => None,
        }
    }

    /// Out-of-range colors arrive as `Color::Default` and unset the target
    fn set(self, r: &mut GraphicRendition, color: Color) {
        match self {
            ColorTarget::Foreground => r.fg = color,
            ColorTarget::Background => r.bg = color,
            ColorTarget::Underline => {
                r.underline_color = (color != Color::Default).then_some(color);
            }
        }
    }
}

fn component(value: Option<i64>) -> Option<u8> {
    u8::try_from(value.unwrap_or(0)).ok()
}

/// Color from a selector and its arguments; out-of-range values give the
/// default color
fn extended_color(selector: i64, args: &[Option<i64>]) -> Option<Color> {
    match (selector, args) {
        (5, [index]) => Some(component(*index).map_or(Color::Default, Color::Indexed)),
        (2, [r, g, b]) => Some(match (component(*r), component(*g), component(*b)) {
            (Some(r), Some(g), Some(b)) => Color::rgb(r, g, b),
            _ => Color::Default,
        }),
        _ => None,
    }
}

/// Colon form: `38:5:N`, `38:2:R:G:B` or `38:2:CS:R:G:B`
fn colon_color(subparams: &[Option<i64>]) -> Option<Color> {
    let (selector, args) = subparams.split_first()?;
    match (selector, args.len()) {
        (Some(5), _) => extended_color(5, args.get(..1)?),
        (Some(2), 3) => extended_color(2, args),
        (Some(2), n) if n >= 4 => extended_color(2, &args[1..4]),
        _ => None,
    }
}

/// Apply an extended color whose code is at `index`. Returns the number of
/// parameters consumed, the code included.
fn apply_extended(
    params: &Params,
    index: usize,
    target: ColorTarget,
    r: &mut GraphicRendition,
) -> usize {
    if let Some(slot) = params.slot(index).filter(|s| s.has_subparams()) {
        match colon_color(slot.subparams()) {
            Some(color) => target.set(r, color),
            None => tracing::debug!(subparams = ?slot.subparams(), "ignored extended color"),
        }
        return 1;
    }

    if index + 1 >= params.len() {
        return 1;
    }
    let selector = params.get(index + 1).unwrap_or(0);
    let Some(&(_, wanted)) = EXTENDED_COLOR_FORMS.iter().find(|(s, _)| *s == selector) else {
        tracing::debug!(selector, "unknown extended color selector");
        return 2;
    };
    let available = params.len() - (index + 2);
    if available < wanted {
        return 2 + available;
    }
    let args: Vec<Option<i64>> = (0..wanted).map(|k| params.get(index + 2 + k)).collect();
    if let Some(color) = extended_color(selector, &args) {
        target.set(r, color);
    }
    2 + wanted
}

fn underline_style(style: Option<i64>) -> Option<UnderlineStyle> {
    match style.unwrap_or(1) {
        1 => Some(UnderlineStyle::Single),
        2 => Some(UnderlineStyle::Double),
        3 => Some(UnderlineStyle::Curly),
        4 => Some(UnderlineStyle::Dotted),
        5 => Some(UnderlineStyle::Dashed),
        _ => None,
    }
}

/// Execute `CSI params m` against the rendition
pub fn apply_sgr(params: &Params, r: &mut GraphicRendition) {
    if params.is_empty() {
        r.reset_sgr();
        return;
    }

    let mut i = 0;
    while let Some(slot) = params.slot(i) {
        let code = slot.value().unwrap_or(0);
        if let Some(target) = ColorTarget::from_code(code) {
            i += apply_extended(params, i, target, r);
            continue;
        }
        if code == 4 && slot.has_subparams() {
            r.underline = underline_style(slot.subparams()[0]);
        } else if let Some(effect) = sgr_effect(code) {
            effect.apply(r);
        } else {
            tracing::debug!(code, "unknown SGR code");
        }
        i += 1;
    }
}
