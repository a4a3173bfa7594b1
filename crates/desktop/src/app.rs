use std::time::Duration;

use iced::widget::{container, image, text};
use iced::{ContentFit, Element, Length, Subscription, Task, Theme};

use crate::settings::Settings;
use crate::workers::session_worker::{self, SessionHandle, SessionMessage};

/// How often the UI drains the session channel.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

#[derive(Debug, Clone)]
pub enum Message {
    Poll,
}

pub struct App {
    session: Option<SessionHandle>,
    frame: Option<image::Handle>,
    error: Option<String>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load_or_create();
        (
            Self {
                session: Some(session_worker::spawn(settings)),
                frame: None,
                error: None,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Poll => self.drain_session(),
        }
        Task::none()
    }

    /// Keeps only the newest frame; an error ends the session.
    fn drain_session(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let mut latest = None;
        let mut failed = None;
        for message in session.messages.try_iter() {
            match message {
                SessionMessage::Frame {
                    width,
                    height,
                    rgba,
                } => latest = Some((width, height, rgba)),
                SessionMessage::Error(e) => failed = Some(e),
            }
        }

        if let Some((width, height, rgba)) = latest {
            self.frame = Some(image::Handle::from_rgba(width, height, rgba));
        }
        if let Some(e) = failed {
            self.error = Some(e);
            self.frame = None;
            self.session = None;
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match (&self.frame, &self.error) {
            (Some(handle), None) => image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            (_, Some(e)) => text(e.as_str()).size(16).into(),
            (None, None) => text("Loading...").size(16).into(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.session.is_some() {
            iced::time::every(POLL_INTERVAL).map(|_| Message::Poll)
        } else {
            Subscription::none()
        }
    }
}
