use anyhow::Result;

use crate::domain::{
    events::KeyInput,
    notice::Notice,
    session_state::SessionState,
    shell_state::{ActivePane, ShellState},
    user::UserId,
};

use super::{
    chat_session::ChatSession,
    contracts::{ChatApi, RealtimeChannel, ShellOrchestrator, TaskRunner},
    events::AppEvent,
};

/// Maps key presses to chat session operations and keeps shell-only state.
pub struct DefaultShellOrchestrator<A, C, R>
where
    A: ChatApi,
    C: RealtimeChannel,
    R: TaskRunner,
{
    state: ShellState,
    session: ChatSession<A, C, R>,
}

impl<A, C, R> DefaultShellOrchestrator<A, C, R>
where
    A: ChatApi,
    C: RealtimeChannel,
    R: TaskRunner,
{
    pub fn new(session: ChatSession<A, C, R>) -> Self {
        Self {
            state: ShellState::default(),
            session,
        }
    }

    /// Subscribes to pushes and requests the first conversation list.
    pub fn start(&mut self) -> Result<()> {
        let viewer_id = self.session.viewer().id;
        if let Err(error) = self.session.connect(viewer_id) {
            // The list still works over REST; sending stays disabled.
            self.state.show_notice(Notice::error(error.code(), error.to_string()));
        }
        self.session.list_conversations();
        Ok(())
    }

    #[cfg(test)]
    pub fn session(&self) -> &ChatSession<A, C, R> {
        &self.session
    }

    fn quit(&mut self) {
        self.session.teardown();
        self.state.stop();
    }

    fn publish_notices(&mut self) {
        if let Some(latest) = self.session.drain_notices().into_iter().last() {
            self.state.show_notice(latest);
        }
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl {
            match key.key.as_str() {
                "c" => self.quit(),
                "f" => self.state.set_active_pane(ActivePane::Search),
                "r" => self.session.list_conversations(),
                _ => {}
            }
            return;
        }

        match self.state.active_pane() {
            ActivePane::Conversations => self.handle_conversations_key(&key.key),
            ActivePane::Messages => self.handle_messages_key(&key.key),
            ActivePane::MessageInput => self.handle_input_key(&key.key),
            ActivePane::Search => self.handle_search_key(&key.key),
        }
    }

    fn handle_conversations_key(&mut self, key: &str) {
        match key {
            "q" => self.quit(),
            "j" | "down" => self.session.state_mut().conversations.select_next(),
            "k" | "up" => self.session.state_mut().conversations.select_previous(),
            "/" => self.state.set_active_pane(ActivePane::Search),
            "r" => self.session.list_conversations(),
            "enter" | "l" | "right" => self.open_selected_conversation(),
            "tab" | "i" if self.session.current_conversation().is_some() => {
                self.state.set_active_pane(ActivePane::MessageInput);
            }
            _ => {}
        }
    }

    fn open_selected_conversation(&mut self) {
        let selected = self
            .session
            .state()
            .conversations
            .selected_conversation()
            .map(|conversation| conversation.id);
        let Some(conversation_id) = selected else {
            return;
        };

        match self.session.open_conversation(conversation_id) {
            Ok(()) => self.state.set_active_pane(ActivePane::MessageInput),
            Err(error) => self
                .state
                .show_notice(Notice::error(error.code(), error.to_string())),
        }
    }

    fn handle_messages_key(&mut self, key: &str) {
        match key {
            "q" => self.quit(),
            "j" | "down" => self.session.state_mut().open.select_next(),
            "k" | "up" => {
                let open = &mut self.session.state_mut().open;
                if open.is_at_top() {
                    self.session.load_older_messages();
                } else {
                    open.select_previous();
                }
            }
            "i" | "tab" | "enter" => self.state.set_active_pane(ActivePane::MessageInput),
            "esc" | "h" | "left" => self.state.set_active_pane(ActivePane::Conversations),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: &str) {
        let input = self.state.message_input_mut();
        match key {
            "enter" => self.submit_message(),
            "esc" => self.state.set_active_pane(ActivePane::Messages),
            "tab" => self.state.set_active_pane(ActivePane::Conversations),
            "backspace" => input.backspace(),
            "delete" => input.delete(),
            "left" => input.move_left(),
            "right" => input.move_right(),
            "home" => input.move_home(),
            "end" => input.move_end(),
            "up" | "pageup" => {
                self.session.load_older_messages();
            }
            other => insert_typed(input, other),
        }
    }

    fn submit_message(&mut self) {
        let text = self.state.message_input_mut().take_text();
        if let Err(error) = self.session.send_message(&text) {
            self.state.message_input_mut().restore(text);
            self.state
                .show_notice(Notice::warning(error.code(), error.to_string()));
        }
    }

    fn handle_search_key(&mut self, key: &str) {
        match key {
            "esc" | "tab" => {
                self.state.set_active_pane(ActivePane::Conversations);
                return;
            }
            "down" => {
                let last = self.session.state().search_results.len().saturating_sub(1);
                let next = (self.state.search_selected() + 1).min(last);
                self.state.set_search_selected(next);
                return;
            }
            "up" => {
                let previous = self.state.search_selected().saturating_sub(1);
                self.state.set_search_selected(previous);
                return;
            }
            "enter" => {
                self.start_conversation_with_selected();
                return;
            }
            "backspace" => self.state.search_input_mut().backspace(),
            "delete" => self.state.search_input_mut().delete(),
            "left" => self.state.search_input_mut().move_left(),
            "right" => self.state.search_input_mut().move_right(),
            other => insert_typed(self.state.search_input_mut(), other),
        }

        // Every edit issues a new search; older results are dropped on arrival.
        self.state.set_search_selected(0);
        let query = self.state.search_input().text().to_owned();
        self.session.search_users(&query);
    }

    fn start_conversation_with_selected(&mut self) {
        let selected = self
            .session
            .state()
            .search_results
            .get(self.state.search_selected())
            .map(|user| user.id);
        let Some(user_id) = selected else {
            return;
        };

        match self.session.create_conversation(user_id) {
            Ok(()) => {
                self.state.search_input_mut().take_text();
                self.state.set_active_pane(ActivePane::MessageInput);
            }
            Err(error) => self
                .state
                .show_notice(Notice::warning(error.code(), error.to_string())),
        }
    }
}

fn insert_typed(input: &mut crate::domain::message_input_state::MessageInputState, key: &str) {
    let mut chars = key.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        input.insert_char(ch);
    } else if key == "space" {
        input.insert_char(' ');
    }
}

impl<A, C, R> ShellOrchestrator for DefaultShellOrchestrator<A, C, R>
where
    A: ChatApi,
    C: RealtimeChannel,
    R: TaskRunner,
{
    fn viewer_id(&self) -> UserId {
        self.session.viewer().id
    }

    fn shell(&self) -> &ShellState {
        &self.state
    }

    fn view_mut(&mut self) -> (&ShellState, &mut SessionState) {
        (&self.state, self.session.state_mut())
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.quit(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::Session(event) => self.session.handle_event(event),
        }

        self.publish_notices();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{events::ConnectivityStatus, user::CurrentUser, user::UserSummary},
        test_support::{conversation, message, FakeChannel, FakeChatApi, ManualTaskRunner},
        usecases::events::SessionEvent,
    };

    type TestShell = DefaultShellOrchestrator<FakeChatApi, FakeChannel, ManualTaskRunner>;

    fn shell(api: &FakeChatApi, channel: &FakeChannel, runner: &ManualTaskRunner) -> TestShell {
        let viewer = CurrentUser {
            id: 1,
            display_name: "Viewer".to_owned(),
            access_token: "token".to_owned(),
        };
        let session = ChatSession::new(
            viewer,
            Arc::new(api.clone()),
            channel.clone(),
            runner.clone(),
            20,
        );
        DefaultShellOrchestrator::new(session)
    }

    fn pump(shell: &mut TestShell, runner: &ManualTaskRunner) {
        while let Some(event) = runner.run_next() {
            shell
                .handle_event(AppEvent::Session(event))
                .expect("session event must be handled");
        }
    }

    fn press(shell: &mut TestShell, key: &str) {
        shell
            .handle_event(AppEvent::InputKey(KeyInput::new(key, false)))
            .expect("key must be handled");
    }

    #[test]
    fn quit_tears_down_the_session() {
        let (api, channel, runner): (FakeChatApi, FakeChannel, ManualTaskRunner) = Default::default();
        let mut shell = shell(&api, &channel, &runner);
        shell.start().expect("start should succeed");

        shell
            .handle_event(AppEvent::QuitRequested)
            .expect("event must be handled");

        assert!(!shell.shell().is_running());
        assert_eq!(channel.active_subscriptions(), 0);
    }

    #[test]
    fn q_in_message_input_is_typed_not_quit() {
        let (api, channel, runner): (FakeChatApi, FakeChannel, ManualTaskRunner) = Default::default();
        api.add_conversation(conversation(3, 1, 2));
        let mut shell = shell(&api, &channel, &runner);
        shell.start().expect("start should succeed");
        pump(&mut shell, &runner);

        press(&mut shell, "enter");
        press(&mut shell, "q");

        assert!(shell.shell().is_running());
        assert_eq!(shell.shell().message_input().text(), "q");
    }

    #[test]
    fn enter_sends_typed_message() {
        let (api, channel, runner): (FakeChatApi, FakeChannel, ManualTaskRunner) = Default::default();
        api.add_conversation(conversation(3, 1, 2));
        api.add_message(message(1, 3, 2, 1, "hello"));
        let mut shell = shell(&api, &channel, &runner);
        shell.start().expect("start should succeed");
        shell
            .handle_event(AppEvent::Session(SessionEvent::ConnectivityChanged {
                link: channel.current_link(),
                status: ConnectivityStatus::Connected,
            }))
            .expect("event must be handled");
        pump(&mut shell, &runner);

        press(&mut shell, "enter");
        for key in ["h", "i"] {
            press(&mut shell, key);
        }
        press(&mut shell, "enter");

        assert_eq!(channel.published().len(), 1);
        assert_eq!(channel.published()[0].content, "hi");
        assert!(shell.shell().message_input().is_empty());
    }

    #[test]
    fn refused_send_keeps_text_and_shows_notice() {
        let (api, channel, runner): (FakeChatApi, FakeChannel, ManualTaskRunner) = Default::default();
        api.add_conversation(conversation(3, 1, 2));
        let mut shell = shell(&api, &channel, &runner);
        shell.start().expect("start should succeed");
        pump(&mut shell, &runner);

        press(&mut shell, "enter");
        press(&mut shell, "x");
        press(&mut shell, "enter");

        assert_eq!(shell.shell().message_input().text(), "x");
        let notice = shell.shell().last_notice().expect("notice should be shown");
        assert_eq!(notice.code, "CHAT_SEND_OFFLINE");
    }

    #[test]
    fn search_enter_opens_conversation_with_selected_user() {
        let (api, channel, runner): (FakeChatApi, FakeChannel, ManualTaskRunner) = Default::default();
        api.add_user(UserSummary {
            id: 7,
            full_name: "Olga".to_owned(),
            email: None,
        });
        let mut shell = shell(&api, &channel, &runner);
        shell.start().expect("start should succeed");
        pump(&mut shell, &runner);

        press(&mut shell, "/");
        press(&mut shell, "o");
        pump(&mut shell, &runner);
        press(&mut shell, "enter");
        pump(&mut shell, &runner);

        let current = shell
            .session()
            .current_conversation()
            .expect("conversation should be open");
        assert!(current.is_between(1, 7));
        assert_eq!(shell.shell().active_pane(), ActivePane::MessageInput);
    }
}
