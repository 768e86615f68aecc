//! 类型定义模块

mod config;
pub mod markup;
mod presentation;
mod session;
mod theme;

pub use config::{
    DetailMode, EmbedConfig, EmbedOptions, MainMode, MainModeDisplay, ThemeFallbackOptions, ThemeFallbacks,
    DEFAULT_DESCRIPTION_MAX_LENGTH, DEFAULT_KEYWORD_PARAM, DEFAULT_SERVICE_URL,
    DEFAULT_STYLE_ROLE,
};
pub use presentation::{DetailRouting, PresentationMode};
pub use session::{EmbedSession, Keyword};
pub use theme::{ComputedStyle, HostStyles, StyleProperty, ThemeDeclaration, ThemeSnapshot};
