use crate::{
    chain::FilterChain,
    error::{ChainError, FilterError},
    filters::Filter,
    types::{Frame, SourceEvent},
};

/// A view that owns one filter chain and the last frame it produced.
///
/// Several surfaces may be fed from the same source; each keeps its own
/// chain, so toggling a filter on one never affects the others.
#[derive(Debug)]
pub struct DisplaySurface {
    label: String,
    chain: FilterChain,
    latest: Option<Frame>,
    enabled: bool,
    frames_rendered: u64,
    frames_skipped: u64,
}

impl DisplaySurface {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_chain(label, FilterChain::new())
    }

    pub fn with_chain(label: impl Into<String>, chain: FilterChain) -> Self {
        Self {
            label: label.into(),
            chain,
            latest: None,
            enabled: true,
            frames_rendered: 0,
            frames_skipped: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut FilterChain {
        &mut self.chain
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled surface ignores source events and keeps showing its last
    /// frame until it is enabled again.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!(
                "{}: {}",
                self.label,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.enabled = enabled;
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.chain.add_filter(filter);
    }

    pub fn remove_filter(&mut self, filter: &Filter) -> Result<(), ChainError> {
        self.chain.remove_filter(filter)
    }

    /// Handles one source tick. Misses, empty frames and filter failures keep
    /// the previous frame on screen. Returns whether a new frame is ready to
    /// paint.
    pub fn on_event(&mut self, event: SourceEvent) -> bool {
        if !self.enabled {
            return false;
        }

        match event {
            SourceEvent::Frame(frame) if frame.is_empty() => {
                log::debug!(
                    "{}: skipping empty {}x{} frame",
                    self.label,
                    frame.width(),
                    frame.height()
                );
                self.frames_skipped += 1;
                false
            }
            SourceEvent::Frame(frame) => match self.on_frame(frame) {
                Ok(_) => true,
                Err(err) => {
                    log::warn!("{}: dropping frame: {err}", self.label);
                    self.frames_skipped += 1;
                    false
                }
            },
            SourceEvent::Missed { reason } => {
                log::debug!("{}: no frame this tick: {reason}", self.label);
                self.frames_skipped += 1;
                false
            }
        }
    }

    /// Runs the chain over `frame` and stores the result for the next repaint.
    pub fn on_frame(&mut self, frame: Frame) -> Result<&Frame, FilterError> {
        let rendered = self.chain.apply_all(frame)?;
        self.frames_rendered += 1;
        Ok(self.latest.insert(rendered))
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FilterError,
        filters::{FilterId, Transform, test_registry},
        types::test_util::gradient_frame,
    };

    struct AlwaysFails;

    impl Transform for AlwaysFails {
        fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
            Err(FilterError::FrameTooSmall {
                filter: "always-fails",
                width: frame.width(),
                height: frame.height(),
            })
        }
    }

    #[test]
    fn surfaces_sharing_a_source_stay_independent() {
        let registry = test_registry();
        let mut a = DisplaySurface::new("a");
        a.add_filter(registry.find(FilterId::Grayscale).unwrap());
        let mut b = DisplaySurface::new("b");

        let raw = gradient_frame(64, 48);
        assert!(a.on_event(SourceEvent::Frame(raw.clone())));
        assert!(b.on_event(SourceEvent::Frame(raw.clone())));

        let out_a = a.latest_frame().unwrap();
        assert_eq!(out_a.channels(), 1);
        assert_eq!(out_a.dimensions(), (64, 48));
        assert_eq!(b.latest_frame(), Some(&raw));
        assert!(b.chain().is_empty());
    }

    #[test]
    fn missed_tick_keeps_previous_frame() {
        let mut surface = DisplaySurface::new("cam");
        let frame = gradient_frame(10, 10);
        surface.on_frame(frame.clone()).unwrap();

        let repaint = surface.on_event(SourceEvent::Missed {
            reason: "camera unplugged".into(),
        });
        assert!(!repaint);
        assert_eq!(surface.latest_frame(), Some(&frame));
        assert_eq!(surface.frames_rendered(), 1);
        assert_eq!(surface.frames_skipped(), 1);
    }

    #[test]
    fn empty_frame_is_skipped_before_the_chain() {
        let registry = test_registry();
        let mut surface = DisplaySurface::new("cam");
        surface.add_filter(registry.find(FilterId::Grayscale).unwrap());
        surface.on_frame(gradient_frame(10, 10)).unwrap();
        let shown = surface.latest_frame().cloned();

        for (w, h) in [(0, 48), (64, 0)] {
            let empty = Frame::Color(image::RgbImage::new(w, h));
            assert!(!surface.on_event(SourceEvent::Frame(empty)));
        }
        assert_eq!(surface.latest_frame().cloned(), shown);
        assert_eq!(surface.frames_rendered(), 1);
        assert_eq!(surface.frames_skipped(), 2);
    }

    #[test]
    fn disabled_surface_ignores_events_until_enabled() {
        let mut surface = DisplaySurface::new("cam");
        assert!(surface.is_enabled());
        let first = gradient_frame(8, 8);
        assert!(surface.on_event(SourceEvent::Frame(first.clone())));

        surface.set_enabled(false);
        assert!(!surface.on_event(SourceEvent::Frame(gradient_frame(9, 9))));
        assert!(!surface.on_event(SourceEvent::Missed {
            reason: "timeout".into(),
        }));
        assert_eq!(surface.latest_frame(), Some(&first));
        assert_eq!(surface.frames_rendered(), 1);
        assert_eq!(surface.frames_skipped(), 0);

        surface.set_enabled(true);
        assert!(surface.on_event(SourceEvent::Frame(gradient_frame(9, 9))));
        assert_eq!(surface.latest_frame().map(Frame::dimensions), Some((9, 9)));
    }

    #[test]
    fn failing_filter_aborts_only_current_frame() {
        let mut surface = DisplaySurface::new("cam");
        let first = gradient_frame(8, 8);
        surface.on_frame(first.clone()).unwrap();

        let broken = Filter::new(FilterId::Sobel, AlwaysFails);
        surface.add_filter(broken.clone());
        assert!(!surface.on_event(SourceEvent::Frame(gradient_frame(8, 8))));
        assert_eq!(surface.latest_frame(), Some(&first));

        surface.remove_filter(&broken).unwrap();
        assert!(surface.on_event(SourceEvent::Frame(gradient_frame(9, 9))));
        assert_eq!(surface.latest_frame().map(Frame::dimensions), Some((9, 9)));
    }
}
