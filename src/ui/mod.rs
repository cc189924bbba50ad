use std::{mem, sync::Arc};

use crossbeam_channel::{Receiver, Sender};
use gpui::prelude::FluentBuilder;
use gpui::{
    AnyElement, App, AppContext, Context, Hsla, InteractiveElement, IntoElement, MouseButton,
    ObjectFit, ParentElement, Render, RenderImage, SharedString, Styled, StyledImage,
    TitlebarOptions, Window, WindowControlArea, WindowDecorations, WindowOptions, div, img, px,
};
use gpui_component::{
    ActiveTheme, Root, Selectable, StyledExt,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use image::Frame as ImageFrame;

use crate::{
    config::AppConfig,
    filters::FilterRegistry,
    pipeline::{self, CameraDevice, CameraStream},
    surface::DisplaySurface,
    types::SourceEvent,
};

mod camera_view;
mod main_view;
mod render_util;
mod titlebar;
pub mod toggles;

use toggles::ToggleBinding;

const SURFACE_MIN_HEIGHT: f32 = 180.0;
const SURFACE_MAX_HEIGHT: f32 = 540.0;
const SINGLE_SURFACE_WIDTH: f32 = 640.0;
const GRID_SURFACE_WIDTH: f32 = 400.0;
const DEFAULT_CAMERA_RATIO: f32 = 4.0 / 3.0;

/// What the window shows besides the surfaces themselves.
#[derive(Clone, Debug)]
pub struct UiOptions {
    pub title: SharedString,
    /// Shows one toggle button per registered filter, wired to the first
    /// surface's chain.
    pub filter_toggles: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            title: "Webcam Filters".into(),
            filter_toggles: true,
        }
    }
}

pub fn launch_ui(
    app: &mut App,
    options: UiOptions,
    config: AppConfig,
    registry: FilterRegistry,
    surfaces: Vec<DisplaySurface>,
    event_rx: Receiver<SourceEvent>,
    event_tx: Sender<SourceEvent>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(options.title.clone()),
            appears_transparent: true,
            traffic_light_position: None,
        }),
        window_decorations: Some(WindowDecorations::Client),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| {
            AppView::new(options, config, &registry, surfaces, event_rx, event_tx)
        });
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    screen: Screen,
    options: UiOptions,
    config: AppConfig,
    surfaces: Vec<DisplaySurface>,
    surface_images: Vec<Option<Arc<RenderImage>>>,
    toggles: Vec<ToggleBinding>,
    event_rx: Receiver<SourceEvent>,
    event_tx: Sender<SourceEvent>,
    camera_stream: Option<CameraStream>,
    available_cameras: Vec<CameraDevice>,
    selected_camera_idx: Option<usize>,
    camera_error: Option<String>,
    camera_picker_open: bool,
}

enum Screen {
    Camera(CameraState),
    Main,
}

enum CameraState {
    Unavailable {
        message: String,
    },
    Selection {
        options: Vec<CameraDevice>,
        selected: usize,
        start_error: Option<String>,
        /// Open `selected` without waiting for a click (single camera or a
        /// configured index). Cleared after the first attempt.
        auto_start: bool,
    },
    Ready,
}

impl AppView {
    fn new(
        options: UiOptions,
        config: AppConfig,
        registry: &FilterRegistry,
        surfaces: Vec<DisplaySurface>,
        event_rx: Receiver<SourceEvent>,
        event_tx: Sender<SourceEvent>,
    ) -> Self {
        let (initial_camera_state, available_cameras) =
            Self::initial_camera_state(config.capture.camera);
        let selected_camera_idx = match &initial_camera_state {
            CameraState::Selection { selected, .. } => Some(*selected),
            _ => None,
        };
        let toggles = if options.filter_toggles && !surfaces.is_empty() {
            toggles::bind_toggles(registry)
        } else {
            Vec::new()
        };
        let surface_images = vec![None; surfaces.len()];

        Self {
            screen: Screen::Camera(initial_camera_state),
            options,
            config,
            surfaces,
            surface_images,
            toggles,
            event_rx,
            event_tx,
            camera_stream: None,
            available_cameras,
            selected_camera_idx,
            camera_error: None,
            camera_picker_open: false,
        }
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let mut screen = mem::replace(&mut self.screen, Screen::Main);
        let view = match screen {
            Screen::Camera(mut state) => {
                let view = self.render_camera_view(&mut state, cx);
                screen = match state {
                    CameraState::Ready => Screen::Main,
                    other => Screen::Camera(other),
                };
                view
            }
            Screen::Main => {
                screen = Screen::Main;
                self.render_main(window, cx)
            }
        };
        self.screen = screen;
        view
    }
}
