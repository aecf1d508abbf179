use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Panel;
use crate::azure::{Branch, NewPullRequest, ReviewerRef, User};
use crate::config::Config;

/// Case-insensitive substring filter on names, preserving order
pub fn filter_by_name<'a, T>(items: &'a [T], query: &str, name: impl Fn(&T) -> &str) -> Vec<&'a T> {
    if query.is_empty() {
        return items.iter().collect();
    }
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| name(item).to_lowercase().contains(&query))
        .collect()
}

/// Apply a typing key to a single-line text buffer. Returns true if consumed.
fn edit_text(buffer: &mut String, key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.push(c);
            true
        }
        KeyCode::Backspace => {
            buffer.pop();
            true
        }
        _ => false,
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

// Search overlay

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub panel: Panel,
    pub query: String,
    /// Cursor in the filtered view
    pub cursor: usize,
    /// Panel cursor to restore on cancel
    pub saved_cursor: Option<usize>,
}

impl SearchState {
    pub fn new(panel: Panel, saved_cursor: Option<usize>) -> Self {
        Self {
            panel,
            query: String::new(),
            cursor: 0,
            saved_cursor,
        }
    }
}

// Config modal

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigField {
    #[default]
    OrgUrl,
    Pat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOutcome {
    Editing,
    Save(Config),
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigForm {
    pub org_url: String,
    pub pat: String,
    pub field: ConfigField,
    pub error: Option<String>,
}

impl ConfigForm {
    pub fn from_config(config: &Config) -> Self {
        let field = if config.azure_org_url.trim().is_empty() {
            ConfigField::OrgUrl
        } else {
            ConfigField::Pat
        };
        Self {
            org_url: config.azure_org_url.clone(),
            pat: config.azure_pat.clone(),
            field,
            error: None,
        }
    }

    pub fn masked_pat(&self) -> String {
        "•".repeat(self.pat.chars().count())
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            ConfigField::OrgUrl => ConfigField::Pat,
            ConfigField::Pat => ConfigField::OrgUrl,
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ConfigOutcome {
        match key.code {
            KeyCode::Esc => return ConfigOutcome::Cancel,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.toggle_field(),
            KeyCode::Enter => {
                let config = Config {
                    azure_org_url: self.org_url.trim().trim_end_matches('/').to_string(),
                    azure_pat: self.pat.trim().to_string(),
                };
                if config.is_complete() {
                    return ConfigOutcome::Save(config);
                }
                self.error = Some("Both fields are required".to_string());
            }
            _ => {
                let buffer = match self.field {
                    ConfigField::OrgUrl => &mut self.org_url,
                    ConfigField::Pat => &mut self.pat,
                };
                if edit_text(buffer, &key) {
                    self.error = None;
                }
            }
        }
        ConfigOutcome::Editing
    }
}

// Pull request creation

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrField {
    #[default]
    Title,
    Description,
    Source,
    Target,
    Reviewers,
}

impl PrField {
    pub const ALL: [PrField; 5] = [
        PrField::Title,
        PrField::Description,
        PrField::Source,
        PrField::Target,
        PrField::Reviewers,
    ];

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            PrField::Title => "Title",
            PrField::Description => "Description",
            PrField::Source => "Source branch",
            PrField::Target => "Target branch",
            PrField::Reviewers => "Reviewers",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrFormOutcome {
    Editing,
    Submit(NewPullRequest),
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct PrForm {
    pub field: PrField,
    pub title: String,
    pub description: String,
    pub branches: Vec<Branch>,
    pub source: Option<usize>,
    pub target: Option<usize>,
    pub users: Vec<User>,
    pub reviewer_query: String,
    pub reviewer_cursor: usize,
    pub reviewers: Vec<User>,
    pub submitting: bool,
    pub error: Option<String>,
}

impl PrForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the branch list and preselect source (latest feature branch) and target (main/master)
    pub fn set_branches(&mut self, branches: Vec<Branch>) {
        self.source = branches.iter().position(|b| !b.is_default_name());
        self.target = branches
            .iter()
            .position(|b| b.name == "refs/heads/main")
            .or_else(|| branches.iter().position(|b| b.name == "refs/heads/master"));
        self.branches = branches;
    }

    pub fn set_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.reviewer_cursor = 0;
    }

    pub fn source_branch(&self) -> Option<&Branch> {
        self.source.and_then(|i| self.branches.get(i))
    }

    pub fn target_branch(&self) -> Option<&Branch> {
        self.target.and_then(|i| self.branches.get(i))
    }

    /// Users matching the reviewer query that are not already added
    pub fn reviewer_candidates(&self) -> Vec<&User> {
        let query = self.reviewer_query.to_lowercase();
        self.users
            .iter()
            .filter(|u| !self.reviewers.iter().any(|r| r.id == u.id))
            .filter(|u| {
                query.is_empty()
                    || u.display_name.to_lowercase().contains(&query)
                    || u.mail_address.to_lowercase().contains(&query)
            })
            .collect()
    }

    fn step_branch(selected: &mut Option<usize>, len: usize, forward: bool) {
        if len == 0 {
            return;
        }
        *selected = Some(match (*selected, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(len - 1),
            (Some(i), false) => i.saturating_sub(1),
        });
    }

    pub fn validate(&self) -> Result<NewPullRequest, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        let (Some(source), Some(target)) = (self.source_branch(), self.target_branch()) else {
            return Err("Source and target branches are required".to_string());
        };
        if source.name == target.name {
            return Err("Source and target branches must differ".to_string());
        }
        Ok(NewPullRequest {
            source_ref_name: source.name.clone(),
            target_ref_name: target.name.clone(),
            title: title.to_string(),
            description: self.description.trim().to_string(),
            reviewers: self
                .reviewers
                .iter()
                .map(|u| ReviewerRef { id: u.id.clone() })
                .collect(),
        })
    }

    fn submit(&mut self) -> PrFormOutcome {
        match self.validate() {
            Ok(pr) => {
                self.error = None;
                PrFormOutcome::Submit(pr)
            }
            Err(e) => {
                self.error = Some(e);
                PrFormOutcome::Editing
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PrFormOutcome {
        if self.submitting {
            return PrFormOutcome::Editing;
        }
        if is_ctrl(&key, 's') {
            return self.submit();
        }
        match key.code {
            KeyCode::Esc => return PrFormOutcome::Cancel,
            KeyCode::Tab => {
                self.field = self.field.next();
                return PrFormOutcome::Editing;
            }
            KeyCode::BackTab => {
                self.field = self.field.prev();
                return PrFormOutcome::Editing;
            }
            _ => {}
        }

        match self.field {
            PrField::Title | PrField::Description => {
                if key.code == KeyCode::Enter {
                    return self.submit();
                }
                let buffer = if self.field == PrField::Title {
                    &mut self.title
                } else {
                    &mut self.description
                };
                edit_text(buffer, &key);
            }
            PrField::Source | PrField::Target => {
                let len = self.branches.len();
                let selected = if self.field == PrField::Source {
                    &mut self.source
                } else {
                    &mut self.target
                };
                match key.code {
                    KeyCode::Down | KeyCode::Char('j') => Self::step_branch(selected, len, true),
                    KeyCode::Up | KeyCode::Char('k') => Self::step_branch(selected, len, false),
                    KeyCode::Enter => return self.submit(),
                    _ => {}
                }
            }
            PrField::Reviewers => match key.code {
                KeyCode::Down => {
                    let len = self.reviewer_candidates().len();
                    if len > 0 {
                        self.reviewer_cursor = (self.reviewer_cursor + 1).min(len - 1);
                    }
                }
                KeyCode::Up => self.reviewer_cursor = self.reviewer_cursor.saturating_sub(1),
                KeyCode::Enter => {
                    let picked = self.reviewer_candidates().get(self.reviewer_cursor).map(|u| (*u).clone());
                    if let Some(user) = picked {
                        self.reviewers.push(user);
                        self.reviewer_query.clear();
                        self.reviewer_cursor = 0;
                    }
                }
                KeyCode::Backspace if self.reviewer_query.is_empty() => {
                    self.reviewers.pop();
                }
                _ => {
                    if edit_text(&mut self.reviewer_query, &key) {
                        self.reviewer_cursor = 0;
                    }
                }
            },
        }
        PrFormOutcome::Editing
    }
}

// Policy override

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    Editing,
    Submit(String),
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideForm {
    pub reason: String,
    pub submitting: bool,
    pub error: Option<String>,
}

impl OverrideForm {
    pub fn handle_key(&mut self, key: KeyEvent) -> OverrideOutcome {
        if self.submitting {
            return OverrideOutcome::Editing;
        }
        match key.code {
            KeyCode::Esc => OverrideOutcome::Cancel,
            KeyCode::Enter => {
                let reason = self.reason.trim();
                if reason.is_empty() {
                    self.error = Some("A bypass reason is required".to_string());
                    OverrideOutcome::Editing
                } else {
                    OverrideOutcome::Submit(reason.to_string())
                }
            }
            _ => {
                if edit_text(&mut self.reason, &key) {
                    self.error = None;
                }
                OverrideOutcome::Editing
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text<F: FnMut(KeyEvent)>(mut send: F, text: &str) {
        for c in text.chars() {
            send(key(KeyCode::Char(c)));
        }
    }

    fn branch(name: &str) -> Branch {
        Branch {
            name: format!("refs/heads/{name}"),
            object_id: None,
        }
    }

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            display_name: name.to_string(),
            mail_address: format!("{}@acme.io", name.to_lowercase()),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_by_name() {
        let names = vec!["Alpha", "beta", "ALPHABET", "gamma"];
        let hits = filter_by_name(&names, "alp", |s| *s);
        assert_eq!(hits, vec![&"Alpha", &"ALPHABET"]);

        let all = filter_by_name(&names, "", |s| *s);
        assert_eq!(all.len(), 4, "Empty query returns everything");

        assert!(filter_by_name(&names, "zeta", |s| *s).is_empty());
    }

    #[test]
    fn test_config_form_requires_both_fields() {
        let mut form = ConfigForm::default();
        type_text(|k| { form.handle_key(k); }, "https://dev.azure.com/Acme/");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), ConfigOutcome::Editing);
        assert!(form.error.is_some());

        form.handle_key(key(KeyCode::Tab));
        type_text(|k| { form.handle_key(k); }, " pat ");
        assert_eq!(form.masked_pat(), "•••••");

        match form.handle_key(key(KeyCode::Enter)) {
            ConfigOutcome::Save(config) => {
                assert_eq!(config.azure_org_url, "https://dev.azure.com/Acme");
                assert_eq!(config.azure_pat, "pat");
            }
            other => panic!("expected save, got {other:?}"),
        }
    }

    #[test]
    fn test_config_form_escape_cancels() {
        let mut form = ConfigForm::default();
        assert_eq!(form.handle_key(key(KeyCode::Esc)), ConfigOutcome::Cancel);
    }

    #[test]
    fn test_pr_form_preselects_branches() {
        let mut form = PrForm::new();
        form.set_branches(vec![branch("main"), branch("feature/login"), branch("develop")]);
        assert_eq!(form.source_branch().map(|b| b.short_name()), Some("feature/login"));
        assert_eq!(form.target_branch().map(|b| b.short_name()), Some("main"));

        form.set_branches(vec![branch("master"), branch("main-ish")]);
        assert_eq!(form.target_branch().map(|b| b.short_name()), Some("master"));

        form.set_branches(vec![branch("main")]);
        assert!(form.source_branch().is_none());
    }

    #[test]
    fn test_pr_form_field_cycle() {
        let mut form = PrForm::new();
        for expected in [PrField::Description, PrField::Source, PrField::Target, PrField::Reviewers, PrField::Title] {
            form.handle_key(key(KeyCode::Tab));
            assert_eq!(form.field, expected);
        }
        form.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(form.field, PrField::Reviewers);
    }

    #[test]
    fn test_pr_form_submit_requires_title_and_branches() {
        let mut form = PrForm::new();
        form.set_branches(vec![branch("main"), branch("feature")]);
        assert_eq!(form.handle_key(key(KeyCode::Enter)), PrFormOutcome::Editing);
        assert_eq!(form.error.as_deref(), Some("Title is required"));

        type_text(|k| { form.handle_key(k); }, "Add login");
        match form.handle_key(key(KeyCode::Enter)) {
            PrFormOutcome::Submit(pr) => {
                assert_eq!(pr.title, "Add login");
                assert_eq!(pr.source_ref_name, "refs/heads/feature");
                assert_eq!(pr.target_ref_name, "refs/heads/main");
            }
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn test_pr_form_branch_stepping() {
        let mut form = PrForm::new();
        form.set_branches(vec![branch("main"), branch("a"), branch("b")]);
        form.field = PrField::Source;
        form.handle_key(key(KeyCode::Down));
        form.handle_key(key(KeyCode::Down));
        assert_eq!(form.source, Some(2), "Stops at the last branch");
        form.handle_key(key(KeyCode::Up));
        assert_eq!(form.source, Some(1));
    }

    #[test]
    fn test_pr_form_reviewer_add_and_remove() {
        let mut form = PrForm::new();
        form.set_users(vec![user("1", "Ada"), user("2", "Grace"), user("3", "Linus")]);
        form.field = PrField::Reviewers;

        type_text(|k| { form.handle_key(k); }, "gra");
        assert_eq!(form.reviewer_candidates().len(), 1);
        form.handle_key(key(KeyCode::Enter));
        assert_eq!(form.reviewers.len(), 1);
        assert_eq!(form.reviewers[0].id, "2");
        assert!(form.reviewer_query.is_empty());
        assert_eq!(form.reviewer_candidates().len(), 2, "Added users are not offered again");

        form.handle_key(key(KeyCode::Backspace));
        assert!(form.reviewers.is_empty(), "Backspace on empty query removes last reviewer");
    }

    #[test]
    fn test_pr_form_ctrl_s_submits_with_reviewers() {
        let mut form = PrForm::new();
        form.set_branches(vec![branch("main"), branch("feature")]);
        form.set_users(vec![user("u1", "Ada")]);
        type_text(|k| { form.handle_key(k); }, "T");
        form.field = PrField::Reviewers;
        form.handle_key(key(KeyCode::Enter));

        match form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)) {
            PrFormOutcome::Submit(pr) => {
                assert_eq!(pr.reviewers, vec![ReviewerRef { id: "u1".to_string() }]);
            }
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn test_override_requires_reason() {
        let mut form = OverrideForm::default();
        assert_eq!(form.handle_key(key(KeyCode::Enter)), OverrideOutcome::Editing);
        assert!(form.error.is_some());
        type_text(|k| { form.handle_key(k); }, "hotfix");
        assert_eq!(
            form.handle_key(key(KeyCode::Enter)),
            OverrideOutcome::Submit("hotfix".to_string())
        );
    }
}
