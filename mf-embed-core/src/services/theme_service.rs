//! Adaptive theming
//!
//! Captures computed styles of nominated host elements once at
//! initialization and maps them to CSS custom properties on the boundary.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::EmbedResult;
use crate::services::ServiceContext;
use crate::traits::NodeId;
use crate::types::markup::THEME_STYLE_ID;
use crate::types::{
    EmbedConfig, HostStyles, StyleProperty, ThemeDeclaration, ThemeFallbacks, ThemeSnapshot,
    DEFAULT_STYLE_ROLE,
};
use crate::utils::color::{is_safe_css_value, is_valid_custom_property};

/// Value used when neither the host nor the fallback table provide one
const UNSET: &str = "unset";

/// Map a theme property name to the (role, computed style property) it is read from.
///
/// `buttonBg` reads the background of the `button` role, `buttonColor` its
/// color, `headingFontFamily` the font of `heading`. Bare `fontFamily`,
/// `color` and `backgroundColor` read the `body` role. Anything else has no
/// host source.
#[must_use]
pub fn style_source(property: &str) -> Option<(String, StyleProperty)> {
    const SUFFIXES: [(&str, StyleProperty); 4] = [
        ("Bg", StyleProperty::BackgroundColor),
        ("BackgroundColor", StyleProperty::BackgroundColor),
        ("Color", StyleProperty::Color),
        ("FontFamily", StyleProperty::FontFamily),
    ];
    let bare = match property {
        "fontFamily" => Some(StyleProperty::FontFamily),
        "color" => Some(StyleProperty::Color),
        "backgroundColor" => Some(StyleProperty::BackgroundColor),
        _ => None,
    };
    if let Some(style) = bare {
        return Some((DEFAULT_STYLE_ROLE.to_string(), style));
    }
    SUFFIXES.into_iter().find_map(|(suffix, style)| {
        property
            .strip_suffix(suffix)
            .filter(|role| !role.is_empty())
            .map(|role| (role.to_string(), style))
    })
}

/// Resolve every css map entry: captured value, then fallback, then `unset`.
///
/// Entries whose variable is not a custom property name are skipped.
#[must_use]
pub fn resolve_theme(
    css_map: &BTreeMap<String, String>,
    fallbacks: &ThemeFallbacks,
    styles: &HostStyles,
) -> ThemeSnapshot {
    let declarations = declarable(css_map)
        .map(|(property, variable)| {
            let captured = style_source(property).and_then(|(role, style)| {
                styles
                    .get(&role)
                    .and_then(|computed| computed.get(style))
                    .filter(|value| is_safe_css_value(value))
                    .map(str::to_string)
            });
            ThemeDeclaration {
                property: property.clone(),
                variable: variable.clone(),
                value: captured.unwrap_or_else(|| fallback_value(fallbacks, property)),
            }
        })
        .collect();
    ThemeSnapshot {
        declarations,
        is_fallback: false,
    }
}

fn declarable(css_map: &BTreeMap<String, String>) -> impl Iterator<Item = (&String, &String)> {
    css_map
        .iter()
        .filter(|(_, variable)| is_valid_custom_property(variable))
}

fn fallback_value(fallbacks: &ThemeFallbacks, property: &str) -> String {
    fallbacks.get(property).unwrap_or(UNSET).to_string()
}

/// Theme adapter
pub struct ThemeService {
    ctx: Rc<ServiceContext>,
}

impl ThemeService {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Read computed styles of the first host element of every role.
    ///
    /// Roles whose selector matches nothing are left out.
    pub fn capture(&self, style_selectors: &BTreeMap<String, String>) -> EmbedResult<HostStyles> {
        let document = self.ctx.document();
        let mut styles = HostStyles::new();
        for (role, selector) in style_selectors {
            match document.query_document(selector)? {
                Some(node) => {
                    styles.insert(role.clone(), document.computed_style(node)?);
                }
                None => log::debug!("No host element for style role '{role}' ({selector})"),
            }
        }
        Ok(styles)
    }

    /// Capture the theme for a session; any extraction error yields the fallback block
    pub fn snapshot(&self, config: &EmbedConfig) -> ThemeSnapshot {
        match self.capture(&config.style_selectors) {
            Ok(styles) => resolve_theme(&config.css_map, &config.fallback_theme, &styles),
            Err(e) => {
                e.report("Theme extraction failed, using fallback theme");
                Self::fallback_snapshot(config)
            }
        }
    }

    /// Fallback values under the configured variable names
    #[must_use]
    pub fn fallback_snapshot(config: &EmbedConfig) -> ThemeSnapshot {
        let declarations = declarable(&config.css_map)
            .map(|(property, variable)| ThemeDeclaration {
                property: property.clone(),
                variable: variable.clone(),
                value: fallback_value(&config.fallback_theme, property),
            })
            .collect();
        ThemeSnapshot {
            declarations,
            is_fallback: true,
        }
    }

    /// Write the snapshot as `<style id="mf-theme">` into `wrapper`
    pub fn apply(&self, wrapper: NodeId, snapshot: &ThemeSnapshot) -> EmbedResult<NodeId> {
        let document = self.ctx.document();
        let style = document.create_element("style")?;
        document.set_attribute(style, "id", THEME_STYLE_ID)?;
        document.set_text_content(style, &snapshot.to_css())?;
        document.append_child(wrapper, style)?;
        Ok(style)
    }
}
