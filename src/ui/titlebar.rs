use super::{
    ActiveTheme, AnyElement, AppView, Context, Hsla, InteractiveElement, IntoElement,
    ParentElement, Styled, Window, WindowControlArea, div, h_flex, px,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum ControlKind {
    Minimize,
    Maximize,
    Close,
}

impl ControlKind {
    fn area(self) -> WindowControlArea {
        match self {
            ControlKind::Minimize => WindowControlArea::Min,
            ControlKind::Maximize => WindowControlArea::Max,
            ControlKind::Close => WindowControlArea::Close,
        }
    }
}

/// One client-side window button.
struct WindowControl {
    id: &'static str,
    kind: ControlKind,
    glyph: &'static str,
}

#[cfg(target_os = "windows")]
const CONTROL_FONT: Option<&str> = Some("Segoe Fluent Icons");
#[cfg(not(target_os = "windows"))]
const CONTROL_FONT: Option<&str> = None;

#[cfg(target_os = "windows")]
const CONTROLS: &[WindowControl] = &[
    WindowControl {
        id: "minimize",
        kind: ControlKind::Minimize,
        glyph: "\u{e921}",
    },
    WindowControl {
        id: "maximize-or-restore",
        kind: ControlKind::Maximize,
        glyph: "\u{e922}",
    },
    WindowControl {
        id: "close",
        kind: ControlKind::Close,
        glyph: "\u{e8bb}",
    },
];

// macOS draws its own traffic lights.
#[cfg(target_os = "macos")]
const CONTROLS: &[WindowControl] = &[];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const CONTROLS: &[WindowControl] = &[
    WindowControl {
        id: "linux-minimize",
        kind: ControlKind::Minimize,
        glyph: "–",
    },
    WindowControl {
        id: "linux-maximize",
        kind: ControlKind::Maximize,
        glyph: "□",
    },
    WindowControl {
        id: "linux-close",
        kind: ControlKind::Close,
        glyph: "✕",
    },
];

impl AppView {
    pub(super) fn render_titlebar(
        &self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();

        let camera_pill = match &self.camera_stream {
            Some(stream) if !stream.is_running() => {
                ("■", "Camera stopped".to_string(), theme.danger)
            }
            Some(stream) if stream.is_paused() => ("⏸", "Paused".to_string(), theme.warning),
            Some(_) => ("●", "Camera live".to_string(), theme.success),
            None => ("○", "Waiting for camera".to_string(), theme.muted_foreground),
        };

        let active: usize = self.surfaces.iter().map(|s| s.chain().len()).sum();
        let filters_pill = (
            "◆",
            match self.surfaces.len() {
                1 => format!("{active} filters active"),
                n => format!("{n} surfaces · {active} filters"),
            },
            if active > 0 {
                theme.info
            } else {
                theme.muted_foreground
            },
        );

        h_flex()
            .window_control_area(WindowControlArea::Drag)
            .h(px(32.0))
            .w_full()
            .items_center()
            .justify_between()
            .bg(gpui::rgb(0x1a2332))
            .child(
                h_flex()
                    .gap_3()
                    .pl(px(80.0))
                    .pr_3()
                    .h_full()
                    .items_center()
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .child(self.options.title.clone()),
                    )
                    .child(status_pill(camera_pill))
                    .child(status_pill(filters_pill)),
            )
            .child(window_controls(window))
            .into_any_element()
    }
}

fn status_pill((icon, text, color): (&str, String, Hsla)) -> AnyElement {
    div()
        .px_2()
        .py_0p5()
        .rounded_md()
        .bg(gpui::rgba(0x00000033))
        .text_xs()
        .text_color(color)
        .child(format!("{icon} {text}"))
        .into_any_element()
}

fn window_controls(window: &Window) -> AnyElement {
    let icon_color = gpui::rgb(0xc9d1d9);
    let hover_bg = gpui::rgb(0x1f2428);
    let close_hover_bg = gpui::rgb(0xe81123);

    h_flex()
        .gap_1()
        .px_2()
        .children(CONTROLS.iter().map(|control| {
            let glyph = if control.kind == ControlKind::Maximize && window.is_maximized() {
                restore_glyph(control.glyph)
            } else {
                control.glyph
            };
            let hover = if control.kind == ControlKind::Close {
                close_hover_bg
            } else {
                hover_bg
            };

            let mut button = div()
                .id(control.id)
                .size(px(28.0))
                .flex()
                .items_center()
                .justify_center()
                .rounded_md()
                .cursor_pointer()
                .occlude()
                .text_size(px(12.0))
                .text_color(icon_color)
                .window_control_area(control.kind.area())
                .hover(move |s| s.bg(hover))
                .child(glyph);
            if let Some(font) = CONTROL_FONT {
                button = button.font_family(font);
            }
            button
        }))
        .into_any_element()
}

fn restore_glyph(maximize: &'static str) -> &'static str {
    match maximize {
        "\u{e922}" => "\u{e923}",
        "□" => "❐",
        other => other,
    }
}
