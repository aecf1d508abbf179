use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use tracing::{debug, error, info, warn};

use crate::autodetect::AutoDetectResult;
use crate::azure::{
    vote, Branch, CompletionOptions, NewPullRequest, Pipeline, Project, PullRequest,
    PullRequestDetail, Repository, Run, TimelineRecord, User,
};
use crate::config::{Config, Theme};
use crate::forms::{
    filter_by_name, ConfigForm, ConfigOutcome, OverrideForm, OverrideOutcome, PrForm,
    PrFormOutcome, SearchState,
};

/// Timeline polling period while a run is active
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3);
/// How long a PR action result stays on screen
pub const MESSAGE_WINDOW: Duration = Duration::from_secs(10);
const STATUS_WINDOW: Duration = Duration::from_secs(5);

pub const REPO_OPTIONS: [&str; 2] = ["Pipelines", "Pull Requests"];
const PIPELINES_OPTION: usize = 0;
const PULL_REQUESTS_OPTION: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Projects,
    Repos,
}

/// The one active screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Browse(Panel),
    RepoOptions,
    Pipelines,
    Runs,
    RunDetails,
    PullRequests,
    PrDetails,
    CreatePr,
    OverridePr,
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Browse(Panel::Projects)
    }
}

/// Entity level a load belongs to. Each slot has its own generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Projects,
    Repos,
    Pipelines,
    Runs,
    Timeline,
    RefreshTimer,
    PullRequests,
    PrDetail,
    Branches,
    Users,
    PrAction,
    CreatePr,
    Autodetect,
    SaveConfig,
}

/// Work for the event loop to run off the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Projects,
    Repos { project: String },
    Pipelines { project: String, repo_name: String },
    Runs { project: String, pipeline_id: i32 },
    Timeline { project: String, pipeline_id: i32, run_id: i32 },
    RefreshTimer { run_id: i32 },
    PullRequests { project: String, repo_id: String },
    PrDetail { project: String, repo_id: String, pr_id: i32 },
    Branches { project: String, repo_id: String },
    Users,
    Vote { project: String, repo_id: String, pr_id: i32, vote: i32 },
    Complete {
        project: String,
        repo_id: String,
        pr_id: i32,
        last_merge_source_commit: Option<String>,
        options: CompletionOptions,
    },
    CreatePr { project: String, repo_id: String, pr: NewPullRequest },
    Autodetect,
    SaveConfig(Config),
}

#[derive(Debug, Clone)]
pub enum LoadResult {
    Projects(Vec<Project>),
    Repos(Vec<Repository>),
    Pipelines(Vec<Pipeline>),
    Runs(Vec<Run>),
    Timeline { run: Run, records: Vec<TimelineRecord> },
    RefreshTick { run_id: i32 },
    PullRequests(Vec<PullRequest>),
    PrDetail(PullRequestDetail),
    Branches(Vec<Branch>),
    Users(Vec<User>),
    PrAction { pr_id: i32, message: String },
    PrCreated(PullRequest),
    Autodetect(AutoDetectResult),
    ConfigSaved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub slot: Slot,
    pub generation: u64,
    pub request: Request,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub slot: Slot,
    pub generation: u64,
    pub result: Result<LoadResult, String>,
}

/// Search result over the focused browse panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchHit<'a> {
    Project(&'a Project),
    Repository(&'a Repository),
}

impl<'a> SearchHit<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            SearchHit::Project(p) => &p.name,
            SearchHit::Repository(r) => &r.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionMessage {
    pub text: String,
    pub at: Instant,
}

enum Motion {
    Down,
    Up,
    Top,
    Bottom,
}

fn cursor(state: &ListState) -> usize {
    state.selected().unwrap_or(0)
}

/// Keep the selection inside `0..len`, or clear it for an empty list
fn clamp(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let i = state.selected().unwrap_or(0).min(len - 1);
        state.select(Some(i));
    }
}

fn restore(state: &mut ListState, index: Option<usize>, len: usize) {
    state.select(Some(index.unwrap_or(0)));
    clamp(state, len);
}

fn move_cursor(state: &mut ListState, len: usize, motion: Motion) {
    if len == 0 {
        return;
    }
    // Stop at the ends, don't wrap
    let i = match motion {
        Motion::Down => state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0),
        Motion::Up => state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0),
        Motion::Top => 0,
        Motion::Bottom => len - 1,
    };
    state.select(Some(i));
}

fn is_forward(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right)
}

fn is_back(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left)
}

fn motion_for(key: &KeyEvent) -> Option<Motion> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Motion::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Motion::Up),
        KeyCode::Char('g') | KeyCode::Home => Some(Motion::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Motion::Bottom),
        _ => None,
    }
}

pub struct App {
    pub config: Config,
    pub theme: Theme,
    pub screen: Screen,
    pub search: Option<SearchState>,
    pub config_modal: Option<ConfigForm>,
    pub show_help: bool,
    pub should_quit: bool,
    /// Set when a load the UI cannot continue without fails
    pub fatal: Option<String>,

    // Loaded lists
    pub projects: Vec<Project>,
    pub repos: Vec<Repository>,
    pub pipelines: Vec<Pipeline>,
    pub runs: Vec<Run>,
    pub timeline: Vec<TimelineRecord>,
    pub pull_requests: Vec<PullRequest>,
    pub pr_detail: Option<PullRequestDetail>,

    // Cursors
    pub project_state: ListState,
    pub repo_state: ListState,
    pub repo_option_state: ListState,
    pub pipeline_state: ListState,
    pub run_state: ListState,
    pub timeline_state: ListState,
    pub pr_state: ListState,
    pub pr_scroll: u16,

    // Selections
    pub selected_project: Option<Project>,
    pub selected_repo: Option<Repository>,
    pub selected_pipeline: Option<Pipeline>,
    pub selected_run: Option<Run>,
    pub selected_pr: Option<PullRequest>,

    // Modals
    pub pr_form: Option<PrForm>,
    pub override_form: Option<OverrideForm>,

    pub auto_refresh: bool,
    pub auto_selected: bool,
    /// Repository to jump into once the autodetected project's repos load
    pending_repo: Option<String>,

    pub action_message: Option<ActionMessage>,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    status_set_at: Option<Instant>,
    pub spinner_frame: usize,

    generations: HashMap<Slot, u64>,
    in_flight: HashSet<Slot>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            theme: Theme::default(),
            screen: Screen::default(),
            search: None,
            config_modal: None,
            show_help: false,
            should_quit: false,
            fatal: None,
            projects: Vec::new(),
            repos: Vec::new(),
            pipelines: Vec::new(),
            runs: Vec::new(),
            timeline: Vec::new(),
            pull_requests: Vec::new(),
            pr_detail: None,
            project_state: ListState::default(),
            repo_state: ListState::default(),
            repo_option_state: ListState::default(),
            pipeline_state: ListState::default(),
            run_state: ListState::default(),
            timeline_state: ListState::default(),
            pr_state: ListState::default(),
            pr_scroll: 0,
            selected_project: None,
            selected_repo: None,
            selected_pipeline: None,
            selected_run: None,
            selected_pr: None,
            pr_form: None,
            override_form: None,
            auto_refresh: false,
            auto_selected: false,
            pending_repo: None,
            action_message: None,
            status_message: None,
            status_is_error: false,
            status_set_at: None,
            spinner_frame: 0,
            generations: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Initial loads, or the config modal when credentials are missing
    pub fn init(&mut self) -> Vec<Dispatch> {
        if !self.config.is_complete() {
            info!("Configuration incomplete, opening config modal");
            self.config_modal = Some(ConfigForm::from_config(&self.config));
            return Vec::new();
        }
        self.projects.clear();
        clamp(&mut self.project_state, 0);
        vec![
            self.dispatch(Slot::Projects, Request::Projects),
            self.dispatch(Slot::Autodetect, Request::Autodetect),
        ]
    }

    // Load bookkeeping

    fn dispatch(&mut self, slot: Slot, request: Request) -> Dispatch {
        let generation = self.generations.entry(slot).or_insert(0);
        *generation += 1;
        self.in_flight.insert(slot);
        debug!(?slot, generation = *generation, "Dispatching load");
        Dispatch {
            slot,
            generation: *generation,
            request,
        }
    }

    /// Drop whatever is in flight for `slot`
    fn abandon(&mut self, slot: Slot) {
        *self.generations.entry(slot).or_insert(0) += 1;
        self.in_flight.remove(&slot);
    }

    pub fn is_loading(&self, slot: Slot) -> bool {
        self.in_flight.contains(&slot)
    }

    pub fn any_loading(&self) -> bool {
        self.in_flight
            .iter()
            .any(|slot| *slot != Slot::RefreshTimer)
    }

    fn project_name(&self) -> Option<String> {
        self.selected_project.as_ref().map(|p| p.name.clone())
    }

    fn repo_scope(&self) -> Option<(String, String)> {
        Some((self.project_name()?, self.selected_repo.as_ref()?.id.clone()))
    }

    // Status and messages

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
        self.status_set_at = Some(Instant::now());
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = true;
        self.status_set_at = Some(Instant::now());
    }

    fn set_action_message(&mut self, text: impl Into<String>) {
        self.action_message = Some(ActionMessage {
            text: text.into(),
            at: Instant::now(),
        });
    }

    /// The PR action message, while it is still inside its display window
    pub fn visible_action_message(&self) -> Option<&str> {
        self.action_message
            .as_ref()
            .filter(|m| m.at.elapsed() < MESSAGE_WINDOW)
            .map(|m| m.text.as_str())
    }

    /// Called on every event loop tick
    pub fn tick(&mut self) {
        if self.any_loading() {
            self.spinner_frame = (self.spinner_frame + 1) % 10;
        }
        if let Some(set_at) = self.status_set_at {
            if set_at.elapsed() > STATUS_WINDOW {
                self.status_message = None;
                self.status_is_error = false;
                self.status_set_at = None;
            }
        }
    }

    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    // Search

    pub fn search_hits(&self) -> Vec<SearchHit<'_>> {
        let Some(search) = &self.search else {
            return Vec::new();
        };
        match search.panel {
            Panel::Projects => filter_by_name(&self.projects, &search.query, |p| &p.name)
                .into_iter()
                .map(SearchHit::Project)
                .collect(),
            Panel::Repos => filter_by_name(&self.repos, &search.query, |r| &r.name)
                .into_iter()
                .map(SearchHit::Repository)
                .collect(),
        }
    }

    // Input

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        if self.config_modal.is_some() {
            return self.handle_config_key(key);
        }
        if self.show_help {
            self.show_help = false;
            return Vec::new();
        }
        match self.screen {
            Screen::CreatePr => return self.handle_create_pr_key(key),
            Screen::OverridePr => return self.handle_override_key(key),
            _ => {}
        }
        if self.search.is_some() {
            return self.handle_search_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Vec::new();
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                return Vec::new();
            }
            _ => {}
        }

        match self.screen {
            Screen::Browse(panel) => self.handle_browse_key(panel, key),
            Screen::RepoOptions => self.handle_repo_options_key(key),
            Screen::Pipelines => self.handle_pipelines_key(key),
            Screen::Runs => self.handle_runs_key(key),
            Screen::RunDetails => self.handle_run_details_key(key),
            Screen::PullRequests => self.handle_pull_requests_key(key),
            Screen::PrDetails => self.handle_pr_details_key(key),
            Screen::CreatePr | Screen::OverridePr => Vec::new(),
        }
    }

    fn handle_config_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        let Some(form) = self.config_modal.as_mut() else {
            return Vec::new();
        };
        match form.handle_key(key) {
            ConfigOutcome::Editing => Vec::new(),
            ConfigOutcome::Cancel => {
                info!("Config modal cancelled");
                self.should_quit = true;
                Vec::new()
            }
            ConfigOutcome::Save(config) => {
                self.config_modal = None;
                self.config = config.clone();
                let mut out = vec![self.dispatch(Slot::SaveConfig, Request::SaveConfig(config))];
                out.extend(self.init());
                out
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        let hits = self.search_hits().len();
        let Some(search) = self.search.as_mut() else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Esc => {
                let search = self.search.take();
                if let Some(search) = search {
                    let state = match search.panel {
                        Panel::Projects => &mut self.project_state,
                        Panel::Repos => &mut self.repo_state,
                    };
                    state.select(search.saved_cursor);
                }
                Vec::new()
            }
            KeyCode::Enter => {
                if hits == 0 {
                    return Vec::new();
                }
                let picked = search.cursor.min(hits - 1);
                let index = match self.search_hits()[picked] {
                    SearchHit::Project(p) => self.projects.iter().position(|x| x.id == p.id),
                    SearchHit::Repository(r) => self.repos.iter().position(|x| x.id == r.id),
                };
                let panel = self.search.take().map(|s| s.panel);
                match (panel, index) {
                    (Some(Panel::Projects), Some(i)) => {
                        self.project_state.select(Some(i));
                        self.select_project()
                    }
                    (Some(Panel::Repos), Some(i)) => {
                        self.repo_state.select(Some(i));
                        self.select_repo();
                        Vec::new()
                    }
                    _ => Vec::new(),
                }
            }
            KeyCode::Down => {
                if hits > 0 {
                    search.cursor = (search.cursor + 1).min(hits - 1);
                }
                Vec::new()
            }
            KeyCode::Up => {
                search.cursor = search.cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Backspace => {
                search.query.pop();
                search.cursor = 0;
                Vec::new()
            }
            KeyCode::Char(c) => {
                search.query.push(c);
                search.cursor = 0;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_browse_key(&mut self, panel: Panel, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            match panel {
                Panel::Projects => move_cursor(&mut self.project_state, self.projects.len(), motion),
                Panel::Repos => move_cursor(&mut self.repo_state, self.repos.len(), motion),
            }
            return Vec::new();
        }
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.screen = Screen::Browse(match panel {
                    Panel::Projects => Panel::Repos,
                    Panel::Repos => Panel::Projects,
                });
                Vec::new()
            }
            KeyCode::Char('/') => {
                let saved = match panel {
                    Panel::Projects => self.project_state.selected(),
                    Panel::Repos => self.repo_state.selected(),
                };
                self.search = Some(SearchState::new(panel, saved));
                Vec::new()
            }
            KeyCode::Char('r') => match panel {
                Panel::Projects => self.reload_projects(),
                Panel::Repos => self.load_repos(),
            },
            _ if is_forward(&key) => match panel {
                Panel::Projects => self.select_project(),
                Panel::Repos => {
                    self.select_repo();
                    Vec::new()
                }
            },
            _ if is_back(&key) && panel == Panel::Repos => {
                self.screen = Screen::Browse(Panel::Projects);
                let index = self.index_of_selected_project();
                restore(&mut self.project_state, index, self.projects.len());
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_repo_options_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            move_cursor(&mut self.repo_option_state, REPO_OPTIONS.len(), motion);
            return Vec::new();
        }
        if is_forward(&key) {
            return match cursor(&self.repo_option_state) {
                PIPELINES_OPTION => self.open_pipelines(),
                _ => self.open_pull_requests(),
            };
        }
        if is_back(&key) {
            self.screen = Screen::Browse(Panel::Repos);
            let index = self.index_of_selected_repo();
            restore(&mut self.repo_state, index, self.repos.len());
        }
        Vec::new()
    }

    fn handle_pipelines_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            move_cursor(&mut self.pipeline_state, self.pipelines.len(), motion);
            return Vec::new();
        }
        if key.code == KeyCode::Char('r') {
            return self.open_pipelines();
        }
        if is_forward(&key) {
            return self.select_pipeline();
        }
        if is_back(&key) {
            self.abandon(Slot::Pipelines);
            self.screen = Screen::RepoOptions;
            self.repo_option_state.select(Some(PIPELINES_OPTION));
        }
        Vec::new()
    }

    fn handle_runs_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            move_cursor(&mut self.run_state, self.runs.len(), motion);
            return Vec::new();
        }
        if key.code == KeyCode::Char('r') {
            return self.load_runs();
        }
        if is_forward(&key) {
            let Some(run) = self.runs.get(cursor(&self.run_state)).cloned() else {
                return Vec::new();
            };
            return self.enter_run_details(run, false);
        }
        if is_back(&key) {
            self.abandon(Slot::Runs);
            self.screen = Screen::Pipelines;
            let index = self.index_of_selected_pipeline();
            restore(&mut self.pipeline_state, index, self.pipelines.len());
        }
        Vec::new()
    }

    fn handle_run_details_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            move_cursor(&mut self.timeline_state, self.timeline.len(), motion);
            return Vec::new();
        }
        if key.code == KeyCode::Char('r') {
            return self.load_timeline().into_iter().collect();
        }
        if is_back(&key) {
            self.leave_run_details();
        }
        Vec::new()
    }

    fn handle_pull_requests_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        if let Some(motion) = motion_for(&key) {
            move_cursor(&mut self.pr_state, self.pull_requests.len(), motion);
            return Vec::new();
        }
        match key.code {
            KeyCode::Char('r') => return self.open_pull_requests(),
            KeyCode::Char('n') => return self.open_create_pr(),
            _ => {}
        }
        if is_forward(&key) {
            return self.select_pr();
        }
        if is_back(&key) {
            self.abandon(Slot::PullRequests);
            self.screen = Screen::RepoOptions;
            self.repo_option_state.select(Some(PULL_REQUESTS_OPTION));
        }
        Vec::new()
    }

    fn handle_pr_details_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.pr_scroll = self.pr_scroll.saturating_add(1);
                return Vec::new();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.pr_scroll = self.pr_scroll.saturating_sub(1);
                return Vec::new();
            }
            KeyCode::Char('g') => {
                self.pr_scroll = 0;
                return Vec::new();
            }
            KeyCode::Char('r') => return self.load_pr_detail(),
            KeyCode::Char('n') => return self.open_create_pr(),
            KeyCode::Char('a') => return self.vote_pr(vote::APPROVE),
            KeyCode::Char('d') => return self.vote_pr(vote::REJECT),
            KeyCode::Char('c') => return self.complete_pr(CompletionOptions::standard()),
            KeyCode::Char('o') => {
                if self.pr_actions_enabled() {
                    self.override_form = Some(OverrideForm::default());
                    self.screen = Screen::OverridePr;
                }
                return Vec::new();
            }
            _ => {}
        }
        if is_back(&key) {
            self.abandon(Slot::PrDetail);
            self.screen = Screen::PullRequests;
            let index = self.index_of_selected_pr();
            restore(&mut self.pr_state, index, self.pull_requests.len());
        }
        Vec::new()
    }

    fn handle_create_pr_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        let Some(form) = self.pr_form.as_mut() else {
            self.screen = Screen::PullRequests;
            return Vec::new();
        };
        match form.handle_key(key) {
            PrFormOutcome::Editing => Vec::new(),
            PrFormOutcome::Cancel => {
                self.abandon(Slot::Branches);
                self.abandon(Slot::Users);
                self.pr_form = None;
                self.screen = Screen::PullRequests;
                Vec::new()
            }
            PrFormOutcome::Submit(pr) => {
                let Some((project, repo_id)) = self.repo_scope() else {
                    return Vec::new();
                };
                if let Some(form) = self.pr_form.as_mut() {
                    form.submitting = true;
                }
                info!(title = %pr.title, "Creating pull request");
                vec![self.dispatch(Slot::CreatePr, Request::CreatePr { project, repo_id, pr })]
            }
        }
    }

    fn handle_override_key(&mut self, key: KeyEvent) -> Vec<Dispatch> {
        let Some(form) = self.override_form.as_mut() else {
            self.screen = Screen::PrDetails;
            return Vec::new();
        };
        match form.handle_key(key) {
            OverrideOutcome::Editing => Vec::new(),
            OverrideOutcome::Cancel => {
                self.override_form = None;
                self.screen = Screen::PrDetails;
                Vec::new()
            }
            OverrideOutcome::Submit(reason) => {
                form.submitting = true;
                self.complete_pr(CompletionOptions::bypass(reason))
            }
        }
    }

    // Transitions

    fn index_of_selected_project(&self) -> Option<usize> {
        let id = &self.selected_project.as_ref()?.id;
        self.projects.iter().position(|p| &p.id == id)
    }

    fn index_of_selected_repo(&self) -> Option<usize> {
        let id = &self.selected_repo.as_ref()?.id;
        self.repos.iter().position(|r| &r.id == id)
    }

    fn index_of_selected_pipeline(&self) -> Option<usize> {
        let id = self.selected_pipeline.as_ref()?.id;
        self.pipelines.iter().position(|p| p.id == id)
    }

    fn index_of_selected_run(&self) -> Option<usize> {
        let id = self.selected_run.as_ref()?.id;
        self.runs.iter().position(|r| r.id == id)
    }

    fn index_of_selected_pr(&self) -> Option<usize> {
        let id = self.selected_pr.as_ref()?.pull_request_id;
        self.pull_requests.iter().position(|p| p.pull_request_id == id)
    }

    fn reload_projects(&mut self) -> Vec<Dispatch> {
        self.projects.clear();
        clamp(&mut self.project_state, 0);
        vec![self.dispatch(Slot::Projects, Request::Projects)]
    }

    /// Clear everything below the repository level
    fn clear_repo_children(&mut self) {
        for slot in [
            Slot::Pipelines,
            Slot::Runs,
            Slot::Timeline,
            Slot::RefreshTimer,
            Slot::PullRequests,
            Slot::PrDetail,
        ] {
            self.abandon(slot);
        }
        self.pipelines.clear();
        self.runs.clear();
        self.timeline.clear();
        self.pull_requests.clear();
        self.pr_detail = None;
        self.selected_pipeline = None;
        self.selected_run = None;
        self.selected_pr = None;
        self.auto_refresh = false;
    }

    fn select_project(&mut self) -> Vec<Dispatch> {
        let Some(project) = self.projects.get(cursor(&self.project_state)).cloned() else {
            return Vec::new();
        };
        debug!(project = %project.name, "Project selected");
        self.selected_project = Some(project);
        self.selected_repo = None;
        self.pending_repo = None;
        self.clear_repo_children();
        self.screen = Screen::Browse(Panel::Repos);
        self.load_repos()
    }

    fn load_repos(&mut self) -> Vec<Dispatch> {
        let Some(project) = self.project_name() else {
            return Vec::new();
        };
        self.repos.clear();
        self.repo_state.select(None);
        vec![self.dispatch(Slot::Repos, Request::Repos { project })]
    }

    fn select_repo(&mut self) {
        let Some(repo) = self.repos.get(cursor(&self.repo_state)).cloned() else {
            return;
        };
        debug!(repo = %repo.name, "Repository selected");
        self.selected_repo = Some(repo);
        self.clear_repo_children();
        self.screen = Screen::RepoOptions;
        self.repo_option_state.select(Some(PIPELINES_OPTION));
    }

    fn open_pipelines(&mut self) -> Vec<Dispatch> {
        let (Some(project), Some(repo)) = (self.project_name(), self.selected_repo.as_ref()) else {
            return Vec::new();
        };
        let repo_name = repo.name.clone();
        self.screen = Screen::Pipelines;
        self.pipelines.clear();
        self.pipeline_state.select(None);
        vec![self.dispatch(Slot::Pipelines, Request::Pipelines { project, repo_name })]
    }

    fn select_pipeline(&mut self) -> Vec<Dispatch> {
        let Some(pipeline) = self.pipelines.get(cursor(&self.pipeline_state)).cloned() else {
            return Vec::new();
        };
        debug!(pipeline = %pipeline.name, "Pipeline selected");
        self.selected_pipeline = Some(pipeline);
        self.selected_run = None;
        self.screen = Screen::Runs;
        self.load_runs()
    }

    fn load_runs(&mut self) -> Vec<Dispatch> {
        let (Some(project), Some(pipeline_id)) =
            (self.project_name(), self.selected_pipeline.as_ref().map(|p| p.id))
        else {
            return Vec::new();
        };
        self.runs.clear();
        self.run_state.select(None);
        vec![self.dispatch(Slot::Runs, Request::Runs { project, pipeline_id })]
    }

    fn enter_run_details(&mut self, run: Run, auto_selected: bool) -> Vec<Dispatch> {
        debug!(run_id = run.id, auto_selected, "Opening run details");
        self.abandon(Slot::RefreshTimer);
        self.auto_selected = auto_selected;
        self.auto_refresh = run.state.is_active();
        self.selected_run = Some(run);
        self.timeline.clear();
        self.timeline_state.select(None);
        self.screen = Screen::RunDetails;

        // The next refresh tick is scheduled once this load lands
        self.load_timeline().into_iter().collect()
    }

    fn load_timeline(&mut self) -> Option<Dispatch> {
        let project = self.project_name()?;
        let pipeline_id = self.selected_pipeline.as_ref()?.id;
        let run_id = self.selected_run.as_ref()?.id;
        Some(self.dispatch(
            Slot::Timeline,
            Request::Timeline {
                project,
                pipeline_id,
                run_id,
            },
        ))
    }

    /// Arm the next tick while an active run is on screen
    fn schedule_refresh(&mut self) -> Option<Dispatch> {
        if !self.auto_refresh || self.screen != Screen::RunDetails {
            return None;
        }
        let run_id = self.selected_run.as_ref()?.id;
        Some(self.dispatch(Slot::RefreshTimer, Request::RefreshTimer { run_id }))
    }

    fn leave_run_details(&mut self) {
        debug!("Leaving run details, auto-refresh off");
        self.auto_refresh = false;
        self.abandon(Slot::RefreshTimer);
        self.abandon(Slot::Timeline);
        self.screen = Screen::Runs;
        let index = self.index_of_selected_run();
        restore(&mut self.run_state, index, self.runs.len());
    }

    fn open_pull_requests(&mut self) -> Vec<Dispatch> {
        let Some((project, repo_id)) = self.repo_scope() else {
            return Vec::new();
        };
        self.screen = Screen::PullRequests;
        self.reload_pull_requests(project, repo_id)
    }

    /// Clear the PR list before fetching it again
    fn reload_pull_requests(&mut self, project: String, repo_id: String) -> Vec<Dispatch> {
        self.pull_requests.clear();
        self.pr_state.select(None);
        vec![self.dispatch(Slot::PullRequests, Request::PullRequests { project, repo_id })]
    }

    fn select_pr(&mut self) -> Vec<Dispatch> {
        let Some(pr) = self.pull_requests.get(cursor(&self.pr_state)).cloned() else {
            return Vec::new();
        };
        debug!(pr_id = pr.pull_request_id, "Pull request selected");
        self.selected_pr = Some(pr);
        self.screen = Screen::PrDetails;
        self.pr_scroll = 0;
        self.pr_detail = None;
        self.load_pr_detail()
    }

    fn load_pr_detail(&mut self) -> Vec<Dispatch> {
        let (Some((project, repo_id)), Some(pr_id)) =
            (self.repo_scope(), self.selected_pr.as_ref().map(|p| p.pull_request_id))
        else {
            return Vec::new();
        };
        vec![self.dispatch(Slot::PrDetail, Request::PrDetail { project, repo_id, pr_id })]
    }

    fn open_create_pr(&mut self) -> Vec<Dispatch> {
        let Some((project, repo_id)) = self.repo_scope() else {
            return Vec::new();
        };
        self.pr_form = Some(PrForm::new());
        self.screen = Screen::CreatePr;
        vec![
            self.dispatch(Slot::Branches, Request::Branches { project, repo_id }),
            self.dispatch(Slot::Users, Request::Users),
        ]
    }

    /// PR actions need a loaded, active PR and no action already running
    pub fn pr_actions_enabled(&self) -> bool {
        self.screen == Screen::PrDetails
            && !self.is_loading(Slot::PrAction)
            && self.pr_detail.as_ref().is_some_and(|d| d.pr.is_active())
    }

    fn vote_pr(&mut self, vote: i32) -> Vec<Dispatch> {
        if !self.pr_actions_enabled() {
            return Vec::new();
        }
        let (Some((project, repo_id)), Some(detail)) = (self.repo_scope(), self.pr_detail.as_ref())
        else {
            return Vec::new();
        };
        let pr_id = detail.pr.pull_request_id;
        info!(pr_id, vote, "Submitting vote");
        vec![self.dispatch(
            Slot::PrAction,
            Request::Vote {
                project,
                repo_id,
                pr_id,
                vote,
            },
        )]
    }

    fn complete_pr(&mut self, options: CompletionOptions) -> Vec<Dispatch> {
        let from_override = self.screen == Screen::OverridePr;
        if !from_override && !self.pr_actions_enabled() {
            return Vec::new();
        }
        let (Some((project, repo_id)), Some(detail)) = (self.repo_scope(), self.pr_detail.as_ref())
        else {
            return Vec::new();
        };
        let pr_id = detail.pr.pull_request_id;
        let last_merge_source_commit = detail
            .pr
            .last_merge_source_commit
            .as_ref()
            .map(|c| c.commit_id.clone());
        info!(pr_id, bypass = options.bypass_policy, "Completing pull request");
        vec![self.dispatch(
            Slot::PrAction,
            Request::Complete {
                project,
                repo_id,
                pr_id,
                last_merge_source_commit,
                options,
            },
        )]
    }

    // Completions

    pub fn apply(&mut self, completion: Completion) -> Vec<Dispatch> {
        let Completion {
            slot,
            generation,
            result,
        } = completion;
        let current = self.generations.get(&slot).copied().unwrap_or(0);
        if generation != current {
            debug!(?slot, generation, current, "Discarding stale completion");
            return Vec::new();
        }
        self.in_flight.remove(&slot);

        match result {
            Ok(loaded) => self.apply_loaded(loaded),
            Err(e) => self.apply_error(slot, e),
        }
    }

    fn apply_error(&mut self, slot: Slot, e: String) -> Vec<Dispatch> {
        let what = match slot {
            Slot::Projects => Some("projects"),
            Slot::Repos => Some("repositories"),
            Slot::Pipelines => Some("pipelines"),
            Slot::Runs => Some("runs"),
            Slot::PullRequests => Some("pull requests"),
            _ => None,
        };
        if let Some(what) = what {
            let message = format!("Failed to load {what}: {e}");
            error!("{message}");
            self.fatal = Some(message);
            self.should_quit = true;
            return Vec::new();
        }

        warn!(?slot, error = %e, "Load failed");
        match slot {
            Slot::Timeline => {
                self.set_error(format!("Failed to load timeline: {e}"));
                return self.schedule_refresh().into_iter().collect();
            }
            Slot::PrDetail => self.set_error(format!("Failed to load PR details: {e}")),
            Slot::Branches | Slot::Users => {
                if let Some(form) = self.pr_form.as_mut() {
                    if slot == Slot::Branches {
                        form.set_branches(Vec::new());
                    } else {
                        form.set_users(Vec::new());
                    }
                }
            }
            Slot::PrAction => {
                self.set_action_message(e);
                if self.screen == Screen::OverridePr {
                    self.override_form = None;
                    self.screen = Screen::PrDetails;
                }
            }
            Slot::CreatePr => {
                if let Some(form) = self.pr_form.as_mut() {
                    form.submitting = false;
                    form.error = Some(format!("Failed to create PR: {e}"));
                }
            }
            Slot::SaveConfig => self.set_error(format!("Failed to save config: {e}")),
            _ => {}
        }
        Vec::new()
    }

    fn apply_loaded(&mut self, loaded: LoadResult) -> Vec<Dispatch> {
        match loaded {
            LoadResult::Projects(projects) => {
                info!(count = projects.len(), "Projects loaded");
                self.projects = projects;
                let index = self.index_of_selected_project();
                restore(&mut self.project_state, index, self.projects.len());
                Vec::new()
            }
            LoadResult::Repos(repos) => {
                debug!(count = repos.len(), "Repositories loaded");
                self.repos = repos;
                clamp(&mut self.repo_state, self.repos.len());
                self.advance_to_detected_repo()
            }
            LoadResult::Pipelines(pipelines) => {
                self.pipelines = pipelines;
                clamp(&mut self.pipeline_state, self.pipelines.len());
                Vec::new()
            }
            LoadResult::Runs(runs) => {
                self.runs = runs;
                clamp(&mut self.run_state, self.runs.len());
                let active = self.runs.iter().position(|r| r.state.is_active());
                match active {
                    Some(i) if self.screen == Screen::Runs => {
                        self.run_state.select(Some(i));
                        let run = self.runs[i].clone();
                        info!(run_id = run.id, "Jumping to active run");
                        self.enter_run_details(run, true)
                    }
                    _ => Vec::new(),
                }
            }
            LoadResult::Timeline { run, records } => {
                self.timeline = records;
                clamp(&mut self.timeline_state, self.timeline.len());
                if let Some(entry) = self.runs.iter_mut().find(|r| r.id == run.id) {
                    *entry = run.clone();
                }
                let finished = !run.state.is_active();
                self.selected_run = Some(run);
                if finished && self.auto_refresh {
                    debug!("Run finished, auto-refresh off");
                    self.auto_refresh = false;
                    self.abandon(Slot::RefreshTimer);
                }
                self.schedule_refresh().into_iter().collect()
            }
            LoadResult::RefreshTick { run_id } => {
                let same_run = self.selected_run.as_ref().is_some_and(|r| r.id == run_id);
                if self.screen != Screen::RunDetails || !self.auto_refresh || !same_run {
                    return Vec::new();
                }
                // A slow load still in flight re-arms the timer when it lands
                if self.is_loading(Slot::Timeline) {
                    debug!(run_id, "Timeline still loading, skipping tick");
                    return Vec::new();
                }
                self.load_timeline().into_iter().collect()
            }
            LoadResult::PullRequests(prs) => {
                self.pull_requests = prs;
                let index = self.index_of_selected_pr();
                restore(&mut self.pr_state, index, self.pull_requests.len());
                Vec::new()
            }
            LoadResult::PrDetail(detail) => {
                self.selected_pr = Some(detail.pr.clone());
                self.pr_detail = Some(detail);
                Vec::new()
            }
            LoadResult::Branches(branches) => {
                if let Some(form) = self.pr_form.as_mut() {
                    form.set_branches(branches);
                }
                Vec::new()
            }
            LoadResult::Users(users) => {
                if let Some(form) = self.pr_form.as_mut() {
                    form.set_users(users);
                }
                Vec::new()
            }
            LoadResult::PrAction { pr_id, message } => {
                info!(pr_id, "{message}");
                self.set_action_message(message);
                if self.screen == Screen::OverridePr {
                    self.override_form = None;
                    self.screen = Screen::PrDetails;
                }
                let still_selected = self
                    .selected_pr
                    .as_ref()
                    .is_some_and(|p| p.pull_request_id == pr_id);
                let mut out = Vec::new();
                if still_selected {
                    out.extend(self.load_pr_detail());
                }
                if let Some((project, repo_id)) = self.repo_scope() {
                    out.extend(self.reload_pull_requests(project, repo_id));
                }
                out
            }
            LoadResult::PrCreated(pr) => {
                info!(pr_id = pr.pull_request_id, "Pull request created");
                self.pr_form = None;
                self.set_action_message(format!("Created PR #{}", pr.pull_request_id));
                self.open_pull_requests()
            }
            LoadResult::Autodetect(result) => self.apply_autodetect(result),
            LoadResult::ConfigSaved(path) => {
                self.set_status(format!("Config saved to {path}"));
                Vec::new()
            }
        }
    }

    fn apply_autodetect(&mut self, result: AutoDetectResult) -> Vec<Dispatch> {
        if !result.should_auto_load {
            return Vec::new();
        }
        let untouched = self.selected_project.is_none()
            && self.screen == Screen::Browse(Panel::Projects)
            && self.search.is_none();
        let (Some(project), Some(repo)) = (result.project, result.repository) else {
            return Vec::new();
        };
        if !untouched {
            debug!("Ignoring autodetect result, user already navigated");
            return Vec::new();
        }
        info!(project = %project.name, repo = %repo.name, "Opening autodetected repository");
        self.selected_project = Some(project);
        self.pending_repo = Some(repo.id);
        self.clear_repo_children();
        if let Some(i) = self.index_of_selected_project() {
            self.project_state.select(Some(i));
        }
        self.screen = Screen::Browse(Panel::Repos);
        self.load_repos()
    }

    fn advance_to_detected_repo(&mut self) -> Vec<Dispatch> {
        let Some(repo_id) = self.pending_repo.take() else {
            return Vec::new();
        };
        let Some(index) = self.repos.iter().position(|r| r.id == repo_id) else {
            return Vec::new();
        };
        if self.screen != Screen::Browse(Panel::Repos) {
            return Vec::new();
        }
        self.repo_state.select(Some(index));
        self.select_repo();
        self.open_pipelines()
    }
}
