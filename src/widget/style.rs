//! Style tables for the container, iframe and toggle button

use super::config::{BorderRadius, ButtonSize, Position, Theme, WidgetConfig};

/// A single CSS declaration
pub type Declaration = (&'static str, &'static str);

/// Distance from the anchored viewport edges
pub const EDGE_OFFSET: &str = "20px";

/// Properties that anchor the container to a corner
pub const OFFSET_PROPERTIES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Iframe transform while hidden (entrance/exit animation start)
pub const HIDDEN_TRANSFORM: &str = "translateY(20px)";

/// Iframe transform at rest
pub const RESTING_TRANSFORM: &str = "translateY(0)";

/// Default iframe height before any `widget:resize`
pub const DEFAULT_FRAME_HEIGHT: &str = "600px";

/// Colors for one theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: &'static str,
    pub foreground: &'static str,
    pub shadow: &'static str,
}

impl Position {
    /// The two offset declarations for this corner
    pub fn offsets(self) -> [Declaration; 2] {
        match self {
            Position::BottomRight => [("bottom", EDGE_OFFSET), ("right", EDGE_OFFSET)],
            Position::BottomLeft => [("bottom", EDGE_OFFSET), ("left", EDGE_OFFSET)],
            Position::TopRight => [("top", EDGE_OFFSET), ("right", EDGE_OFFSET)],
            Position::TopLeft => [("top", EDGE_OFFSET), ("left", EDGE_OFFSET)],
        }
    }
}

impl ButtonSize {
    pub fn pixels(self) -> u32 {
        match self {
            ButtonSize::Small => 48,
            ButtonSize::Medium => 60,
            ButtonSize::Large => 72,
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            ButtonSize::Small => "48px",
            ButtonSize::Medium => "60px",
            ButtonSize::Large => "72px",
        }
    }
}

impl BorderRadius {
    pub fn css(self) -> &'static str {
        match self {
            BorderRadius::None => "0",
            BorderRadius::Small => "8px",
            BorderRadius::Medium => "16px",
            BorderRadius::Large => "50%",
        }
    }
}

impl Theme {
    pub fn palette(self) -> ThemePalette {
        match self {
            Theme::Light => ThemePalette {
                background: "#ffffff",
                foreground: "#111827",
                shadow: "0 4px 12px rgba(0, 0, 0, 0.15)",
            },
            Theme::Dark => ThemePalette {
                background: "#111827",
                foreground: "#ffffff",
                shadow: "0 4px 12px rgba(0, 0, 0, 0.45)",
            },
        }
    }
}

/// Container declarations: fixed positioning plus exactly two corner offsets
pub fn container_style(position: Position) -> Vec<Declaration> {
    let mut style = vec![
        ("position", "fixed"),
        ("z-index", "2147483000"),
        ("display", "flex"),
        (
            "flex-direction",
            if position.is_top() {
                "column-reverse"
            } else {
                "column"
            },
        ),
        (
            "align-items",
            if position.is_left() {
                "flex-start"
            } else {
                "flex-end"
            },
        ),
        ("gap", "16px"),
    ];
    style.extend(position.offsets());
    style
}

/// Iframe declarations; starts hidden so the first open can animate in
pub fn frame_style() -> Vec<Declaration> {
    vec![
        ("border", "none"),
        ("width", "380px"),
        ("max-width", "calc(100vw - 40px)"),
        ("height", DEFAULT_FRAME_HEIGHT),
        ("border-radius", "12px"),
        ("box-shadow", "0 8px 32px rgba(0, 0, 0, 0.2)"),
        ("transition", "opacity 0.3s ease, transform 0.3s ease"),
        ("display", "none"),
        ("opacity", "0"),
        ("transform", HIDDEN_TRANSFORM),
    ]
}

/// Toggle button declarations from the size, radius and theme tables
pub fn button_style(config: &WidgetConfig) -> Vec<Declaration> {
    let size = config.button_size().css();
    let palette = config.theme().palette();
    vec![
        ("width", size),
        ("height", size),
        ("border-radius", config.border_radius().css()),
        ("background", palette.background),
        ("color", palette.foreground),
        ("box-shadow", palette.shadow),
        ("border", "none"),
        ("cursor", "pointer"),
        ("display", "flex"),
        ("align-items", "center"),
        ("justify-content", "center"),
        ("font-size", "24px"),
    ]
}
