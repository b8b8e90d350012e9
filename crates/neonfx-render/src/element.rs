#![forbid(unsafe_code)]

//! Visual targets.
//!
//! An [`Element`] is the thing effects decorate: a title, a panel, a whole
//! screen. Effects never own it. They hold a [`WeakElement`] and override
//! fields of its [`VisualProps`], restoring them when they finish.
//!
//! The element also records which [`EffectKind`]s are attached so that two
//! effects of the same kind cannot fight over one property set.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::color::PackedRgba;

/// The effect families that can attach to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    Glitch,
    Flicker,
    ScanLines,
    Rain,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Glitch,
        EffectKind::Flicker,
        EffectKind::ScanLines,
        EffectKind::Rain,
    ];

    /// Stable lowercase name, used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Glitch => "glitch",
            Self::Flicker => "flicker",
            Self::ScanLines => "scan-lines",
            Self::Rain => "rain",
        }
    }

    #[must_use]
    pub const fn flag(self) -> EffectKinds {
        match self {
            Self::Glitch => EffectKinds::GLITCH,
            Self::Flicker => EffectKinds::FLICKER,
            Self::ScanLines => EffectKinds::SCAN_LINES,
            Self::Rain => EffectKinds::RAIN,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Set of attached effect kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EffectKinds: u8 {
        const GLITCH     = 0b0001;
        const FLICKER    = 0b0010;
        const SCAN_LINES = 0b0100;
        const RAIN       = 0b1000;
    }
}

/// A drop shadow. Glitch bursts use two of these as a color split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub color: PackedRgba,
}

impl Shadow {
    #[must_use]
    pub const fn new(offset_x: f32, offset_y: f32, blur: f32, color: PackedRgba) -> Self {
        Self {
            offset_x,
            offset_y,
            blur,
            color,
        }
    }
}

/// Repeating horizontal line overlay drawn over an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLineOverlay {
    /// Pixels between lines.
    pub spacing: f32,
    pub opacity: f32,
    /// Vertical scroll phase in `[0, spacing)`.
    pub offset: f32,
    pub color: PackedRgba,
}

/// Overridable presentation state of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualProps {
    pub opacity: f32,
    pub brightness: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub skew_deg: f32,
    pub blur_px: f32,
    pub shadows: Vec<Shadow>,
    pub classes: BTreeSet<String>,
    pub overlay: Option<ScanLineOverlay>,
    pub attached: EffectKinds,
}

impl Default for VisualProps {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            brightness: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            skew_deg: 0.0,
            blur_px: 0.0,
            shadows: Vec::new(),
            classes: BTreeSet::new(),
            overlay: None,
            attached: EffectKinds::empty(),
        }
    }
}

impl VisualProps {
    /// True when no transform, filter, or shadow is applied.
    #[must_use]
    pub fn is_untransformed(&self) -> bool {
        self.offset_x == 0.0
            && self.offset_y == 0.0
            && self.skew_deg == 0.0
            && self.blur_px == 0.0
            && self.shadows.is_empty()
    }
}

struct ElementInner {
    label: String,
    props: VisualProps,
}

/// Shared handle to a visual target. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Element {
    inner: Rc<RefCell<ElementInner>>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Element")
            .field("label", &inner.label)
            .field("props", &inner.props)
            .finish()
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new("element")
    }
}

impl Element {
    /// Create an element with neutral visual properties.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_props(label, VisualProps::default())
    }

    #[must_use]
    pub fn with_props(label: impl Into<String>, props: VisualProps) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ElementInner {
                label: label.into(),
                props,
            })),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    /// Copy of the current visual properties.
    #[must_use]
    pub fn snapshot(&self) -> VisualProps {
        self.inner.borrow().props.clone()
    }

    /// Mutate the visual properties in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut VisualProps) -> R) -> R {
        f(&mut self.inner.borrow_mut().props)
    }

    /// Read the visual properties without cloning.
    pub fn inspect<R>(&self, f: impl FnOnce(&VisualProps) -> R) -> R {
        f(&self.inner.borrow().props)
    }

    pub fn add_class(&self, class: &str) -> bool {
        self.update(|props| props.classes.insert(class.to_string()))
    }

    pub fn remove_class(&self, class: &str) -> bool {
        self.update(|props| props.classes.remove(class))
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.inspect(|props| props.classes.contains(class))
    }

    /// Mark `kind` as attached. Returns `false` if it already was.
    pub fn try_attach(&self, kind: EffectKind) -> bool {
        self.update(|props| {
            if props.attached.contains(kind.flag()) {
                false
            } else {
                props.attached.insert(kind.flag());
                true
            }
        })
    }

    /// Clear the attachment mark for `kind`.
    pub fn detach(&self, kind: EffectKind) {
        self.update(|props| props.attached.remove(kind.flag()));
    }

    #[must_use]
    pub fn attached(&self) -> EffectKinds {
        self.inspect(|props| props.attached)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same element.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Non-owning element reference held by effects.
#[derive(Clone, Default)]
pub struct WeakElement {
    inner: Weak<RefCell<ElementInner>>,
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakElement")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WeakElement {
    #[must_use]
    pub fn upgrade(&self) -> Option<Element> {
        self.inner.upgrade().map(|inner| Element { inner })
    }

    /// Whether the element has been dropped by every owner.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_rejects_duplicate_kind() {
        let el = Element::new("title");
        assert!(el.try_attach(EffectKind::Glitch));
        assert!(!el.try_attach(EffectKind::Glitch));
        assert!(el.try_attach(EffectKind::Flicker));
        assert_eq!(el.attached(), EffectKinds::GLITCH | EffectKinds::FLICKER);
        el.detach(EffectKind::Glitch);
        assert!(el.try_attach(EffectKind::Glitch));
    }

    #[test]
    fn weak_reference_does_not_keep_element_alive() {
        let el = Element::new("panel");
        let weak = el.downgrade();
        assert!(weak.upgrade().is_some_and(|e| e.ptr_eq(&el)));
        assert!(!weak.is_released());
        drop(el);
        assert!(weak.upgrade().is_none());
        assert!(weak.is_released());
    }

    #[test]
    fn classes_and_snapshot() {
        let el = Element::new("x");
        assert!(el.add_class("neonfx-glitch"));
        assert!(!el.add_class("neonfx-glitch"));
        el.update(|p| p.opacity = 0.5);
        let snap = el.snapshot();
        assert_eq!(snap.opacity, 0.5);
        assert!(snap.classes.contains("neonfx-glitch"));
        assert!(el.remove_class("neonfx-glitch"));
        assert!(!el.has_class("neonfx-glitch"));
    }

    #[test]
    fn default_props_are_untransformed() {
        let props = VisualProps::default();
        assert!(props.is_untransformed());
        assert_eq!(props.opacity, 1.0);
        assert_eq!(props.brightness, 1.0);
    }

    #[test]
    fn kind_names() {
        let names: Vec<_> = EffectKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["glitch", "flicker", "scan-lines", "rain"]);
    }

    #[test]
    fn kind_serializes_as_its_name() {
        for kind in EffectKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            let back: EffectKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }
}
