use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ticklist_core::{
    store::{StoreEvent, TaskStore},
    tasks::{Task, TaskError, TaskId, TaskPersistence},
    view::{Filter, TaskStats},
};

use super::form::{EditSession, Field};
use crate::config::UiConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Form(EditSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
}

/// Everything the TUI shows. The store owns task data; the app owns view
/// state (selection, input mode, edit session, toast).
pub struct App<P: TaskPersistence> {
    store: TaskStore<P>,
    mode: Mode,
    selected: usize,
    search_input: String,
    toast: Option<Toast>,
    toast_ttl: Duration,
    notices: Rc<RefCell<Vec<String>>>,
    dirty: Rc<Cell<bool>>,
    today: NaiveDate,
    should_quit: bool,
}

impl<P: TaskPersistence> App<P> {
    pub fn new(mut store: TaskStore<P>, ui: &UiConfig, today: NaiveDate) -> Self {
        store.set_filter(ui.default_filter);

        let notices: Rc<RefCell<Vec<String>>> = Rc::default();
        let dirty = Rc::new(Cell::new(true));
        {
            let notices = Rc::clone(&notices);
            let dirty = Rc::clone(&dirty);
            store.subscribe(move |event| {
                dirty.set(true);
                if let Some(message) = notice_for(event) {
                    notices.borrow_mut().push(message);
                }
            });
        }
        if let Some(err) = store.load_warning() {
            notices
                .borrow_mut()
                .push(format!("Could not load saved tasks: {err}"));
        }

        Self {
            store,
            mode: Mode::Normal,
            selected: 0,
            search_input: String::new(),
            toast: None,
            toast_ttl: Duration::from_millis(ui.toast_millis),
            notices,
            dirty,
            today,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &TaskStore<P> {
        &self.store
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.store.visible()
    }

    pub fn stats(&self) -> TaskStats {
        self.store.stats()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Returns and clears the redraw flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Promote pending notices to the toast line and expire old toasts.
    pub fn tick(&mut self, now: Instant, today: NaiveDate) {
        if today != self.today {
            self.today = today;
            self.mark_dirty();
        }
        let latest = self.notices.borrow_mut().drain(..).last();
        if let Some(message) = latest {
            self.show(message, now);
        } else if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
            self.mark_dirty();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.normal_key(key),
            Mode::Search => self.search_key(key),
            Mode::Form(session) => self.form_key(session, key),
        }
        self.clamp_selection();
        self.mark_dirty();
    }

    fn normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.selected = self.selected.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.toggle(&id).map(|_| ());
                    self.report(result);
                }
            }
            KeyCode::Char('a') => self.mode = Mode::Form(EditSession::adding()),
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_id().and_then(|id| self.store.get(&id)) {
                    self.mode = Mode::Form(EditSession::editing(task));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.delete(&id).map(|_| ());
                    self.report(result);
                }
            }
            KeyCode::Char('f') => self.store.set_filter(self.store.filter().cycle()),
            KeyCode::Char('1') => self.store.set_filter(Filter::All),
            KeyCode::Char('2') => self.store.set_filter(Filter::Pending),
            KeyCode::Char('3') => self.store.set_filter(Filter::Completed),
            KeyCode::Char('/') => self.mode = Mode::Search,
            _ => {}
        }
    }

    fn search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => return,
            KeyCode::Esc => self.search_input.clear(),
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => self.search_input.push(c),
            _ => {}
        }
        self.store.set_search(&self.search_input);
        if key.code != KeyCode::Esc {
            self.mode = Mode::Search;
        }
    }

    fn form_key(&mut self, mut session: EditSession, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                if self.submit(&session) {
                    return;
                }
            }
            KeyCode::Tab | KeyCode::Down => session.focus_next(),
            KeyCode::BackTab | KeyCode::Up => session.focus_prev(),
            KeyCode::Left if session.focus == Field::Priority => session.cycle_priority(false),
            KeyCode::Right if session.focus == Field::Priority => session.cycle_priority(true),
            KeyCode::Backspace => session.backspace(),
            KeyCode::Char(c) => session.insert(c),
            _ => {}
        }
        self.mode = Mode::Form(session);
    }

    /// Returns true when the form can close.
    fn submit(&mut self, session: &EditSession) -> bool {
        let draft = match session.to_draft() {
            Ok(draft) => draft,
            Err(err) => {
                self.report(Err(err));
                return false;
            }
        };
        let result = match &session.target {
            Some(id) => self.store.edit(id, draft).map(|_| ()),
            None => self.store.create(draft).map(|_| ()),
        };
        let closed = result.is_ok();
        self.report(result);
        if closed && session.target.is_none() {
            self.selected = 0;
        }
        closed
    }

    /// Validation and not-found errors become a notice; the list is unchanged.
    fn report(&mut self, result: Result<(), TaskError>) {
        if let Err(err) = result {
            self.notices.borrow_mut().push(err.to_string());
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.store
            .visible()
            .get(self.selected)
            .map(|task| task.id().clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.store.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn show(&mut self, message: String, now: Instant) {
        self.toast = Some(Toast {
            message,
            expires_at: now + self.toast_ttl,
        });
        self.mark_dirty();
    }
}

fn notice_for(event: &StoreEvent) -> Option<String> {
    match event {
        StoreEvent::TaskCreated(_) => Some("Task added successfully!".to_string()),
        StoreEvent::TaskEdited(_) => Some("Task updated successfully!".to_string()),
        StoreEvent::TaskDeleted(_) => Some("Task deleted successfully!".to_string()),
        StoreEvent::PersistFailed(err) => Some(format!("Not saved to disk: {err}")),
        StoreEvent::TaskToggled { .. }
        | StoreEvent::FilterChanged(_)
        | StoreEvent::SearchChanged(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use ticklist_core::{
        storage::{InMemoryStore, KeyValueStore, StoreError},
        tasks::Priority,
    };
    use ticklist_task::KvTaskRepo;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("date")
    }

    fn app_with<S: KeyValueStore>(kv: S) -> App<KvTaskRepo<S>> {
        App::new(
            TaskStore::open(KvTaskRepo::new(kv)),
            &UiConfig::default(),
            today(),
        )
    }

    fn app() -> App<KvTaskRepo<InMemoryStore>> {
        app_with(InMemoryStore::new())
    }

    fn press(app: &mut App<impl TaskPersistence>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<impl TaskPersistence>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_task(app: &mut App<impl TaskPersistence>, text: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, text);
        press(app, KeyCode::Enter);
    }

    fn visible_texts(app: &App<impl TaskPersistence>) -> Vec<String> {
        app.visible().iter().map(|t| t.text().to_string()).collect()
    }

    #[test]
    fn adding_through_the_form_creates_task_and_toast() {
        let mut app = app();
        add_task(&mut app, "Buy milk");
        let now = Instant::now();
        app.tick(now, today());

        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(visible_texts(&app), ["Buy milk"]);
        assert_eq!(
            app.toast().map(|t| t.message.as_str()),
            Some("Task added successfully!")
        );

        app.tick(now + Duration::from_millis(2_001), today());
        assert!(app.toast().is_none());
    }

    #[test]
    fn blank_submission_keeps_form_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        app.tick(Instant::now(), today());

        assert!(matches!(app.mode(), Mode::Form(_)));
        assert_eq!(app.stats().total, 0);
        assert!(app
            .toast()
            .is_some_and(|t| t.message.starts_with("invalid input")));
    }

    #[test]
    fn escape_cancels_form_without_changes() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Never mind");
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(app.stats().total, 0);
        assert!(!app.should_quit());
    }

    #[test]
    fn editing_selected_task_replaces_fields() {
        let mut app = app();
        add_task(&mut app, "Draft");

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, " v2");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Enter);

        let task = app.visible()[0].clone();
        assert_eq!(task.text(), "Draft v2");
        assert_eq!(task.priority(), Priority::High);
        assert_eq!(app.mode(), &Mode::Normal);
    }

    #[test]
    fn toggle_filter_and_delete_follow_selection() {
        let mut app = app();
        add_task(&mut app, "Write report");
        add_task(&mut app, "Pay bills");

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(visible_texts(&app), ["Pay bills"]);

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(visible_texts(&app), ["Write report"]);

        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected(), 1);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(visible_texts(&app), ["Pay bills"]);
        assert_eq!(app.selected(), 0);
    }

    #[test]
    fn search_mode_filters_live_and_escape_clears() {
        let mut app = app();
        add_task(&mut app, "Call client");
        add_task(&mut app, "Buy bread");

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "CALL");
        assert_eq!(app.mode(), &Mode::Search);
        assert_eq!(app.store().query(), "call");
        assert_eq!(visible_texts(&app), ["Call client"]);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(app.search_input(), "CALL");

        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(visible_texts(&app).len(), 2);
    }

    struct FullDisk;

    impl KeyValueStore for FullDisk {
        fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Storage {
                reason: "no space left on device".into(),
            })
        }

        fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound { key: key.into() })
        }

        fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn persistence_failure_is_surfaced_but_task_kept() {
        let mut app = app_with(FullDisk);
        add_task(&mut app, "Offline task");
        app.tick(Instant::now(), today());

        assert_eq!(visible_texts(&app), ["Offline task"]);
        assert!(app
            .toast()
            .is_some_and(|t| t.message.starts_with("Not saved to disk")));
    }

    #[test]
    fn store_changes_mark_view_dirty() {
        let mut app = app();
        assert!(app.take_dirty());
        assert!(!app.take_dirty());

        add_task(&mut app, "Redraw me");
        assert!(app.take_dirty());
    }

    #[test]
    fn q_quits() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
