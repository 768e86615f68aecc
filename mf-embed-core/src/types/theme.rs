//! Theme related type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Subset of an element's computed style the theme adapter reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    pub font_family: String,
    pub color: String,
    pub background_color: String,
}

impl ComputedStyle {
    /// Value of a single property, `None` when empty
    #[must_use]
    pub fn get(&self, property: StyleProperty) -> Option<&str> {
        let value = match property {
            StyleProperty::FontFamily => &self.font_family,
            StyleProperty::Color => &self.color,
            StyleProperty::BackgroundColor => &self.background_color,
        };
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// Computed style property captured from host elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleProperty {
    FontFamily,
    Color,
    BackgroundColor,
}

/// role -> computed style of the first host element matching the role's selector
pub type HostStyles = BTreeMap<String, ComputedStyle>;

/// One resolved theme variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDeclaration {
    /// Theme property key from the css map (e.g. `buttonBg`)
    pub property: String,
    /// CSS custom property name (e.g. `--mf-button-bg`)
    pub variable: String,
    pub value: String,
}

/// Theme captured once at initialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSnapshot {
    pub declarations: Vec<ThemeDeclaration>,
    /// `true` when host extraction failed and the whole fallback block was used
    pub is_fallback: bool,
}

impl ThemeSnapshot {
    /// Resolved value of a theme property
    #[must_use]
    pub fn value_of(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    /// Render as a `:host` style block
    #[must_use]
    pub fn to_css(&self) -> String {
        let mut css = String::from(":host {");
        for declaration in &self.declarations {
            css.push_str(&format!(" {}: {};", declaration.variable, declaration.value));
        }
        css.push_str(" }");
        css
    }
}
