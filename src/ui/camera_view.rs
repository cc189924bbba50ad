use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, CameraDevice, CameraState, Context,
    FluentBuilder, InteractiveElement, IntoElement, MouseButton, ParentElement, Screen,
    SharedString, Styled, StyledExt, div, h_flex, pipeline, px, v_flex,
};

/// Where the picker is shown, which decides what a click on a row does.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PickerMode {
    /// Startup screen: a click only moves the selection.
    Startup,
    /// Overlay on the main view: a click switches the running camera.
    Switch,
}

impl AppView {
    fn render_camera_picker(
        &self,
        cameras: &[CameraDevice],
        selected_idx: Option<usize>,
        error_msg: Option<&str>,
        mode: PickerMode,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let mut title_row = h_flex()
            .justify_between()
            .items_center()
            .w_full()
            .mb_2()
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(div().text_base().text_color(gpui::rgb(0xa5b4fc)).child("◉"))
                    .child(
                        div()
                            .text_sm()
                            .font_semibold()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .child("Select camera"),
                    ),
            );
        if mode == PickerMode::Switch {
            title_row = title_row.child(
                Button::new(SharedString::from("camera-picker-close"))
                    .label("×")
                    .ghost()
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.camera_picker_open = false;
                        cx.notify();
                    })),
            );
        }

        let mut picker = v_flex()
            .gap_2()
            .p_4()
            .rounded_xl()
            .bg(gpui::rgba(0x0f1419f5))
            .border_1()
            .border_color(gpui::rgba(0x2d3748ff))
            .shadow_lg()
            .child(title_row);

        for (idx, device) in cameras.iter().enumerate() {
            let is_selected = selected_idx == Some(idx);
            picker = picker.child(
                h_flex()
                    .w_full()
                    .gap_3()
                    .items_center()
                    .p_3()
                    .rounded_lg()
                    .cursor_pointer()
                    .border_1()
                    .map(|this| {
                        if is_selected {
                            this.bg(gpui::rgba(0x2d374855))
                                .border_color(gpui::rgba(0x64748bff))
                        } else {
                            this.bg(gpui::rgba(0x1e293b00))
                                .border_color(gpui::rgba(0x33415500))
                        }
                    })
                    .hover(|this| {
                        this.bg(gpui::rgba(0x2d374844))
                            .border_color(gpui::rgba(0x475569ff))
                    })
                    .on_mouse_down(
                        MouseButton::Left,
                        cx.listener(move |this, _, _, cx| {
                            match mode {
                                PickerMode::Startup => this.select_camera(idx),
                                PickerMode::Switch => this.switch_camera(idx),
                            }
                            cx.notify();
                        }),
                    )
                    .child(
                        div()
                            .text_lg()
                            .flex_shrink_0()
                            .text_color(if is_selected {
                                gpui::rgb(0xa5b4fc)
                            } else {
                                gpui::rgb(0x94a3b8)
                            })
                            .child("●"),
                    )
                    .child(
                        div()
                            .flex_1()
                            .text_sm()
                            .text_color(if is_selected {
                                gpui::rgb(0xe2e8f0)
                            } else {
                                gpui::rgb(0xcbd5e1)
                            })
                            .overflow_hidden()
                            .text_ellipsis()
                            .whitespace_nowrap()
                            .child(device.label.clone()),
                    )
                    .when(is_selected, |this| {
                        this.child(
                            div()
                                .text_sm()
                                .flex_shrink_0()
                                .text_color(gpui::rgb(0xa5b4fc))
                                .child("✓"),
                        )
                    }),
            );
        }

        if let Some(err) = error_msg {
            picker = picker.child(error_banner(err));
        }

        if mode == PickerMode::Startup {
            picker = picker.child(
                Button::new(SharedString::from("camera-confirm"))
                    .primary()
                    .label("✓ Use selected camera")
                    .w_full()
                    .mt_2()
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.start_selected_camera();
                        cx.notify();
                    })),
            );
        }

        picker.into_any_element()
    }

    pub(super) fn render_camera_switcher(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        self.render_camera_picker(
            &self.available_cameras,
            self.selected_camera_idx,
            self.camera_error.as_deref(),
            PickerMode::Switch,
            cx,
        )
    }

    /// Enumerates cameras once at startup. `preferred` preselects an index
    /// and opens it without waiting for the user.
    pub(super) fn initial_camera_state(
        preferred: Option<usize>,
    ) -> (CameraState, Vec<CameraDevice>) {
        match pipeline::available_cameras() {
            Ok(cameras) if cameras.is_empty() => (
                CameraState::Unavailable {
                    message: "No camera was detected".to_string(),
                },
                Vec::new(),
            ),
            Ok(cameras) => {
                let configured = preferred.filter(|idx| {
                    let known = *idx < cameras.len();
                    if !known {
                        log::warn!(
                            "configured camera {idx} not found, {} available",
                            cameras.len()
                        );
                    }
                    known
                });
                (
                    CameraState::Selection {
                        options: cameras.clone(),
                        selected: configured.unwrap_or(0),
                        start_error: None,
                        auto_start: configured.is_some() || cameras.len() == 1,
                    },
                    cameras,
                )
            }
            Err(err) => {
                log::error!("failed to enumerate cameras: {err:?}");
                (
                    CameraState::Unavailable {
                        message: format!("Failed to list cameras: {err:#}"),
                    },
                    Vec::new(),
                )
            }
        }
    }

    pub(super) fn render_camera_view(
        &mut self,
        state: &mut CameraState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        match state {
            CameraState::Unavailable { message } => v_flex()
                .gap_2()
                .p_4()
                .rounded_lg()
                .border_1()
                .border_color(theme.border)
                .bg(theme.group_box)
                .child(
                    div()
                        .text_sm()
                        .text_color(theme.accent)
                        .font_semibold()
                        .child("⚠ No camera available"),
                )
                .child(
                    div()
                        .text_xs()
                        .text_color(theme.muted_foreground)
                        .child("Check the camera connection and permissions"),
                )
                .child(div().text_color(theme.foreground).child(message.clone()))
                .into_any_element(),
            CameraState::Selection {
                options,
                selected,
                start_error,
                auto_start,
            } => {
                if *auto_start && self.camera_stream.is_none() {
                    *auto_start = false;
                    if let Some(device) = options.get(*selected).cloned() {
                        match self.start_camera_for_device(&device) {
                            Ok(()) => {
                                self.selected_camera_idx = Some(*selected);
                                *state = CameraState::Ready;
                                return div()
                                    .child(div().child("Starting camera..."))
                                    .into_any_element();
                            }
                            Err(err) => {
                                *start_error = Some(format!("Could not start camera: {err}"));
                            }
                        }
                    }
                }

                let picker = self.render_camera_picker(
                    options,
                    Some(*selected),
                    start_error.as_deref(),
                    PickerMode::Startup,
                    cx,
                );

                div()
                    .size_full()
                    .flex()
                    .items_center()
                    .justify_center()
                    .bg(gpui::rgba(0x1a233288))
                    .child(div().w(px(450.0)).child(picker))
                    .into_any_element()
            }
            CameraState::Ready => v_flex()
                .gap_2()
                .p_4()
                .rounded_lg()
                .border_1()
                .border_color(theme.border)
                .bg(theme.group_box)
                .child(
                    div()
                        .text_sm()
                        .text_color(theme.foreground)
                        .child("⟳ Starting camera..."),
                )
                .into_any_element(),
        }
    }

    pub(super) fn switch_camera(&mut self, idx: usize) {
        let Some(device) = self.available_cameras.get(idx).cloned() else {
            self.camera_error = Some("Selected camera is no longer available".to_string());
            return;
        };

        match self.start_camera_for_device(&device) {
            Ok(()) => {
                self.selected_camera_idx = Some(idx);
                self.camera_picker_open = false;
            }
            Err(err) => {
                self.camera_error = Some(format!("Could not start camera: {err}"));
            }
        }
    }

    fn select_camera(&mut self, selected: usize) {
        if let Screen::Camera(CameraState::Selection {
            options,
            selected: current,
            start_error,
            ..
        }) = &mut self.screen
        {
            if selected < options.len() {
                *current = selected;
                *start_error = None;
                self.selected_camera_idx = Some(selected);
            }
        }
    }

    fn stop_camera_stream(&mut self) {
        if let Some(stream) = self.camera_stream.take() {
            stream.stop();
        }
    }

    fn start_camera_for_device(&mut self, device: &CameraDevice) -> Result<(), String> {
        self.stop_camera_stream();
        log::info!("starting camera {}", device.label);

        pipeline::start_camera_stream(
            device.index.clone(),
            &self.config.capture,
            self.event_tx.clone(),
        )
        .map(|stream| {
            self.camera_stream = Some(stream);
            self.camera_error = None;
        })
        .map_err(|err| format!("{err:#}"))
    }

    fn start_selected_camera(&mut self) {
        let selected_device = match &self.screen {
            Screen::Camera(CameraState::Selection {
                options, selected, ..
            }) => options
                .get(*selected)
                .cloned()
                .map(|device| (*selected, device)),
            _ => None,
        };

        let Some((selected_idx, device)) = selected_device else {
            if let Screen::Camera(CameraState::Selection { start_error, .. }) = &mut self.screen {
                *start_error = Some("Selected camera is no longer available".to_string());
            }
            return;
        };

        match self.start_camera_for_device(&device) {
            Ok(()) => {
                self.selected_camera_idx = Some(selected_idx);
                self.camera_picker_open = false;
                self.screen = Screen::Main;
            }
            Err(err) => {
                if let Screen::Camera(CameraState::Selection { start_error, .. }) = &mut self.screen
                {
                    *start_error = Some(format!("Could not start camera: {err}"));
                }
            }
        }
    }
}

fn error_banner(message: &str) -> AnyElement {
    h_flex()
        .gap_2()
        .items_start()
        .mt_2()
        .p_3()
        .rounded_lg()
        .bg(gpui::rgba(0x7f1d1d33))
        .border_1()
        .border_color(gpui::rgba(0xef4444aa))
        .child(
            div()
                .text_sm()
                .flex_shrink_0()
                .text_color(gpui::rgb(0xfca5a5))
                .child("!"),
        )
        .child(
            div()
                .flex_1()
                .text_xs()
                .text_color(gpui::rgb(0xfca5a5))
                .overflow_hidden()
                .child(message.to_string()),
        )
        .into_any_element()
}
