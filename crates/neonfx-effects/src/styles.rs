#![forbid(unsafe_code)]

//! Base rule text and class names.
//!
//! Hosts that render through a stylesheet engine load [`BASE_STYLES`] once;
//! every factory calls [`ensure_base_styles`], which is idempotent by
//! [`BASE_STYLES_ID`].

use neonfx_render::StylesheetRegistry;

/// Registry id of the base rules.
pub const BASE_STYLES_ID: &str = "neonfx-base-styles";

pub const GLITCH_CLASS: &str = "neonfx-glitch";
pub const FLICKER_CLASS: &str = "neonfx-flicker";
pub const SCANLINES_CLASS: &str = "neonfx-scanlines";
pub const RAIN_CLASS: &str = "neonfx-rain";

/// Selector and keyframe rules the effect classes rely on.
pub const BASE_STYLES: &str = "\
.neonfx-glitch { position: relative; will-change: transform, filter; }
.neonfx-flicker { will-change: opacity, filter; }
.neonfx-scanlines { position: relative; overflow: hidden; }
.neonfx-scanlines::after {
  content: ''; position: absolute; inset: 0; pointer-events: none;
  background: repeating-linear-gradient(0deg, rgba(0, 0, 0, var(--neonfx-scan-opacity, 0.15)) 0,
    rgba(0, 0, 0, var(--neonfx-scan-opacity, 0.15)) 1px, transparent 1px,
    transparent var(--neonfx-scan-spacing, 3px));
  transform: translateY(var(--neonfx-scan-offset, 0));
}
.neonfx-rain { position: relative; }
@keyframes neonfx-glitch-shift {
  0% { transform: translate(0); }
  25% { transform: translate(-2px, 1px) skewX(1deg); }
  50% { transform: translate(2px, -1px) skewX(-1deg); }
  75% { transform: translate(-1px, -1px); }
  100% { transform: translate(0); }
}";

/// Inject [`BASE_STYLES`] unless already present. Returns `true` on the
/// injecting call.
pub fn ensure_base_styles(registry: &StylesheetRegistry) -> bool {
    let injected = registry.ensure_injected(BASE_STYLES_ID, BASE_STYLES);
    if injected {
        tracing::debug!(id = BASE_STYLES_ID, "base styles injected");
    }
    injected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injection_is_idempotent() {
        let registry = StylesheetRegistry::new();
        assert!(ensure_base_styles(&registry));
        assert!(!ensure_base_styles(&registry));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.rules(BASE_STYLES_ID).as_deref(), Some(BASE_STYLES));
    }

    #[test]
    fn rules_mention_every_class() {
        for class in [GLITCH_CLASS, FLICKER_CLASS, SCANLINES_CLASS, RAIN_CLASS] {
            assert!(BASE_STYLES.contains(&format!(".{class}")), "{class} missing");
        }
    }
}
