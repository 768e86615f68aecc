//! Presentation state machine types

use serde::Serialize;

use super::config::{DetailMode, MainMode};

/// Where detail content goes when a trigger is clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DetailRouting {
    /// Into the `#mf-detail-container` element of the main view
    Container,
    /// Into a freshly created overlay
    Overlay,
}

/// Effective presentation state of a session.
///
/// Selected once per initialization; a session never transitions to another
/// state. `modal` main with `inlineOnModal` detail has no two-pane layout to
/// offer and collapses onto [`PresentationMode::ModalWithModalDetail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentationMode {
    InlineWithInlineDetail,
    InlineWithModalDetail,
    InlineWithSplitDetail,
    ModalWithInlineDetail,
    ModalWithModalDetail,
}

impl PresentationMode {
    /// Select the presentation state for a mode pair
    #[must_use]
    pub fn select(main: MainMode, detail: DetailMode) -> Self {
        match (main, detail) {
            (MainMode::Inline, DetailMode::Inline) => Self::InlineWithInlineDetail,
            (MainMode::Inline, DetailMode::Modal) => Self::InlineWithModalDetail,
            (MainMode::Inline, DetailMode::InlineOnModal) => Self::InlineWithSplitDetail,
            (MainMode::Modal, DetailMode::Inline) => Self::ModalWithInlineDetail,
            (MainMode::Modal, DetailMode::Modal | DetailMode::InlineOnModal) => {
                Self::ModalWithModalDetail
            }
        }
    }

    #[must_use]
    pub fn main_mode(self) -> MainMode {
        match self {
            Self::InlineWithInlineDetail | Self::InlineWithModalDetail | Self::InlineWithSplitDetail => {
                MainMode::Inline
            }
            Self::ModalWithInlineDetail | Self::ModalWithModalDetail => MainMode::Modal,
        }
    }

    #[must_use]
    pub fn detail_routing(self) -> DetailRouting {
        match self {
            Self::InlineWithInlineDetail | Self::InlineWithSplitDetail | Self::ModalWithInlineDetail => {
                DetailRouting::Container
            }
            Self::InlineWithModalDetail | Self::ModalWithModalDetail => DetailRouting::Overlay,
        }
    }

    /// Whether the main view is laid out as list and detail panes
    #[must_use]
    pub fn is_split(self) -> bool {
        matches!(self, Self::InlineWithSplitDetail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_every_combination() {
        use DetailMode as D;
        use MainMode as M;
        use PresentationMode as P;

        assert_eq!(P::select(M::Inline, D::Inline), P::InlineWithInlineDetail);
        assert_eq!(P::select(M::Inline, D::Modal), P::InlineWithModalDetail);
        assert_eq!(P::select(M::Inline, D::InlineOnModal), P::InlineWithSplitDetail);
        assert_eq!(P::select(M::Modal, D::Inline), P::ModalWithInlineDetail);
        assert_eq!(P::select(M::Modal, D::Modal), P::ModalWithModalDetail);
    }

    #[test]
    fn modal_main_with_split_detail_degenerates_to_modal_modal() {
        let mode = PresentationMode::select(MainMode::Modal, DetailMode::InlineOnModal);
        assert_eq!(mode, PresentationMode::ModalWithModalDetail);
        assert_eq!(mode.detail_routing(), DetailRouting::Overlay);
        assert!(!mode.is_split());
    }

    #[test]
    fn split_routes_into_container() {
        let mode = PresentationMode::InlineWithSplitDetail;
        assert_eq!(mode.main_mode(), MainMode::Inline);
        assert_eq!(mode.detail_routing(), DetailRouting::Container);
    }
}
