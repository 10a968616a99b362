//! Orientation guard: the keyboard needs a landscape viewport.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    None,
    Block,
    Flex,
}

impl Display {
    /// CSS `display` value.
    pub fn as_css(self) -> &'static str {
        match self {
            Display::None => "none",
            Display::Block => "block",
            Display::Flex => "flex",
        }
    }
}

/// `display` values for the main content and the rotate-device prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub content: Display,
    pub rotate_prompt: Display,
}

impl Layout {
    pub fn shows_content(&self) -> bool {
        self.content != Display::None
    }
}

/// Portrait viewports (narrower than tall) get the rotate prompt instead
/// of the keyboard. A square viewport counts as landscape.
pub fn orientation_layout(width: f64, height: f64) -> Layout {
    if width < height {
        Layout {
            content: Display::None,
            rotate_prompt: Display::Flex,
        }
    } else {
        Layout {
            content: Display::Block,
            rotate_prompt: Display::None,
        }
    }
}
