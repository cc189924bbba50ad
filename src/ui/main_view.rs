use super::render_util::frame_to_image;
use super::toggles::toggle_rows;
use super::{
    AnyElement, AppView, Arc, Button, ButtonVariants, Context, DEFAULT_CAMERA_RATIO,
    GRID_SURFACE_WIDTH, IntoElement, ObjectFit, ParentElement, RenderImage, SINGLE_SURFACE_WIDTH,
    SURFACE_MAX_HEIGHT, SURFACE_MIN_HEIGHT, Selectable, SharedString, Styled, StyledImage, Window,
    div, h_flex, img, px, v_flex,
};
use crate::{surface::DisplaySurface, types::SourceEvent};

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        self.drain_source_events(window, cx);

        let surface_width = if self.surfaces.len() > 1 {
            GRID_SURFACE_WIDTH
        } else {
            SINGLE_SURFACE_WIDTH
        };
        let surface_height = (surface_width / self.camera_aspect_ratio())
            .clamp(SURFACE_MIN_HEIGHT, SURFACE_MAX_HEIGHT);

        let cards: Vec<AnyElement> = self
            .surfaces
            .iter()
            .zip(&self.surface_images)
            .enumerate()
            .map(|(idx, (surface, image))| {
                let enabled = surface.is_enabled();
                let enable_button =
                    Button::new(SharedString::from(format!("surface-enable-{idx}")))
                        .ghost()
                        .label(if enabled { "Disable" } else { "Enable" })
                        .on_click(cx.listener(move |this, _, _, cx| {
                            if let Some(surface) = this.surfaces.get_mut(idx) {
                                surface.set_enabled(!enabled);
                            }
                            cx.notify();
                        }));
                surface_card(
                    surface,
                    image.as_ref(),
                    enable_button,
                    surface_width,
                    surface_height,
                )
            })
            .collect();

        let mut content = v_flex()
            .flex_1()
            .gap_3()
            .p_4()
            .items_center()
            .child(self.render_controls_row(cx))
            .child(
                h_flex()
                    .flex_wrap()
                    .justify_center()
                    .gap_3()
                    .children(cards),
            );

        if !self.toggles.is_empty() {
            content = content.child(self.render_toggle_grid(cx));
        }

        if self.camera_picker_open && !self.available_cameras.is_empty() {
            content = content.child(div().w(px(420.0)).child(self.render_camera_switcher(cx)));
        } else if let Some(err) = &self.camera_error {
            content = content.child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .p_3()
                    .rounded_lg()
                    .bg(gpui::rgba(0xef444433))
                    .border_1()
                    .border_color(gpui::rgba(0xef4444ff))
                    .child(div().text_base().child("⚠️"))
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0xfca5a5))
                            .child(err.clone()),
                    ),
            );
        }

        let titlebar = self.render_titlebar(window, cx);

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .child(titlebar)
            .child(content)
            .into_any_element()
    }

    /// Feeds every pending source event to every surface, then refreshes the
    /// GPU image of each surface that produced a new frame.
    fn drain_source_events(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let mut dirty = vec![false; self.surfaces.len()];
        while let Ok(event) = self.event_rx.try_recv() {
            for (surface, dirty) in self.surfaces.iter_mut().zip(dirty.iter_mut()) {
                *dirty |= surface.on_event(event.clone());
            }
            if let SourceEvent::Frame(frame) = &event {
                log::debug!("drained {}x{} frame", frame.width(), frame.height());
            }
        }

        for (idx, dirty) in dirty.into_iter().enumerate() {
            if !dirty {
                continue;
            }
            let image = self.surfaces[idx].latest_frame().map(frame_to_image);
            if let Some(image) = image {
                self.replace_surface_image(idx, image, window, cx);
            }
        }
    }

    fn render_controls_row(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let camera_label = self
            .selected_camera_idx
            .and_then(|idx| self.available_cameras.get(idx))
            .map(|c| c.label.clone())
            .unwrap_or_else(|| "No camera selected".to_string());

        let stream_status = match &self.camera_stream {
            Some(stream) if !stream.is_running() => format!("{camera_label} · stopped"),
            Some(stream) => {
                let (width, height) = stream.resolution();
                format!(
                    "{camera_label} · {width}x{height} @ {} fps",
                    stream.frame_rate()
                )
            }
            None => format!("{camera_label} · not running"),
        };

        let paused = self.is_paused();
        let mut row = h_flex()
            .gap_2()
            .items_center()
            .child(
                div()
                    .text_xs()
                    .text_color(gpui::rgb(0xa0aab8))
                    .overflow_hidden()
                    .text_ellipsis()
                    .whitespace_nowrap()
                    .child(stream_status),
            )
            .child(
                Button::new(SharedString::from("capture-pause"))
                    .outline()
                    .label(if paused { "▶ Resume" } else { "⏸ Pause" })
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.toggle_pause();
                        cx.notify();
                    })),
            );

        if self.available_cameras.len() > 1 {
            let picker_label = if self.camera_picker_open {
                "◉ Close"
            } else {
                "◉ Switch camera"
            };
            row = row.child(
                Button::new(SharedString::from("camera-picker-toggle"))
                    .outline()
                    .label(picker_label)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.camera_picker_open = !this.camera_picker_open;
                        cx.notify();
                    })),
            );
        }

        row.into_any_element()
    }

    fn render_toggle_grid(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let mut grid = v_flex().gap_2().items_center();
        for row in toggle_rows(self.toggles.len()) {
            let mut buttons = h_flex().gap_2();
            for idx in row {
                let binding = &self.toggles[idx];
                buttons = buttons.child(
                    Button::new(binding.control_id.clone())
                        .outline()
                        .label(binding.label())
                        .selected(binding.active)
                        .on_click(cx.listener(move |this, _, _, cx| {
                            this.toggle_filter(idx);
                            cx.notify();
                        })),
                );
            }
            grid = grid.child(buttons);
        }
        grid.into_any_element()
    }

    /// Toggles only ever drive the first surface.
    fn toggle_filter(&mut self, idx: usize) {
        let (Some(binding), Some(surface)) = (self.toggles.get_mut(idx), self.surfaces.first_mut())
        else {
            return;
        };

        match binding.toggle(surface.chain_mut()) {
            Ok(active) => log::info!(
                "{} {} ({} active)",
                binding.label(),
                if active { "on" } else { "off" },
                surface.chain().len()
            ),
            Err(err) => log::warn!("{err}"),
        }
    }

    fn is_paused(&self) -> bool {
        self.camera_stream
            .as_ref()
            .is_some_and(|stream| stream.is_paused())
    }

    fn toggle_pause(&mut self) {
        if let Some(stream) = &self.camera_stream {
            let paused = !stream.is_paused();
            stream.set_paused(paused);
            log::info!("capture {}", if paused { "paused" } else { "resumed" });
        }
    }

    fn camera_aspect_ratio(&self) -> f32 {
        if let Some((width, height)) = self.camera_stream.as_ref().map(|s| s.resolution()) {
            if height > 0 {
                return width as f32 / height as f32;
            }
        }
        DEFAULT_CAMERA_RATIO
    }

    fn replace_surface_image(
        &mut self,
        idx: usize,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        let Some(slot) = self.surface_images.get_mut(idx) else {
            return;
        };
        if let Some(old_image) = slot.replace(new_image) {
            // Release the previous texture, the sprite atlas keeps it otherwise.
            cx.drop_image(old_image, Some(window));
        }
    }
}

fn surface_card(
    surface: &DisplaySurface,
    image: Option<&Arc<RenderImage>>,
    enable_button: Button,
    width: f32,
    height: f32,
) -> AnyElement {
    let frame_view: AnyElement = match image {
        Some(image) => img(image.clone())
            .size_full()
            .object_fit(ObjectFit::Contain)
            .rounded_t_lg()
            .into_any_element(),
        None => div()
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .text_sm()
            .text_color(gpui::rgb(0x8b95a5))
            .rounded_t_lg()
            .child("Waiting for camera...")
            .into_any_element(),
    };

    let chain_text = if surface.chain().is_empty() {
        "no filters".to_string()
    } else {
        surface
            .chain()
            .filters()
            .iter()
            .map(|f| f.label())
            .collect::<Vec<_>>()
            .join(" → ")
    };

    let stats = match surface.latest_frame() {
        _ if !surface.is_enabled() => "disabled".to_string(),
        Some(frame) => format!(
            "{}x{} · {}ch · {} shown · {} skipped",
            frame.width(),
            frame.height(),
            frame.channels(),
            surface.frames_rendered(),
            surface.frames_skipped()
        ),
        None => format!("{} skipped", surface.frames_skipped()),
    };

    v_flex()
        .w(px(width))
        .rounded_lg()
        .overflow_hidden()
        .bg(gpui::rgb(0x0f1419))
        .child(
            div()
                .w(px(width))
                .h(px(height))
                .overflow_hidden()
                .bg(gpui::rgb(0x000000))
                .child(frame_view),
        )
        .child(
            v_flex()
                .gap_1()
                .p_3()
                .child(
                    h_flex()
                        .justify_between()
                        .child(
                            div()
                                .text_sm()
                                .text_color(gpui::rgb(0xe2e8f0))
                                .child(surface.label().to_string()),
                        )
                        .child(
                            div()
                                .text_xs()
                                .text_color(gpui::rgb(0xa0aab8))
                                .child(chain_text),
                        ),
                )
                .child(
                    h_flex()
                        .justify_between()
                        .items_center()
                        .child(
                            div()
                                .text_xs()
                                .text_color(gpui::rgb(0x8b95a5))
                                .overflow_hidden()
                                .text_ellipsis()
                                .whitespace_nowrap()
                                .child(stats),
                        )
                        .child(enable_button),
                ),
        )
        .into_any_element()
}
