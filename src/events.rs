use crate::app::{App, Completion, Dispatch, LoadResult, Request, REFRESH_INTERVAL};
use crate::autodetect;
use crate::azure::{vote, AzureClient};
use crate::ui;
use anyhow::{anyhow, Result};
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::prelude::*;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum AppEvent {
    Tick,
    Key(KeyEvent),
    Resize(u16, u16),
    Completion(Completion),
}

/// Terminal input and ticks, plus completions posted by load tasks, on one channel
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let input_tx = tx.clone();

        tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut tick = tokio::time::interval(tick_rate);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if input_tx.send(AppEvent::Tick).is_err() {
                            break;
                        }
                    }
                    Some(Ok(event)) = reader.next() => {
                        let send_result = match event {
                            // Windows reports press and release
                            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                                input_tx.send(AppEvent::Key(key))
                            }
                            CrosstermEvent::Resize(w, h) => input_tx.send(AppEvent::Resize(w, h)),
                            _ => Ok(()),
                        };
                        if send_result.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, tx }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let mut client: Option<AzureClient> = None;
    let mut client_config = None;

    let initial = app.init();
    spawn_all(initial, app, &mut client, &mut client_config, &events);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let Some(event) = events.next().await else {
            break;
        };
        let dispatches = match event {
            AppEvent::Tick => {
                app.tick();
                Vec::new()
            }
            AppEvent::Key(key) => app.handle_key(key),
            AppEvent::Resize(w, h) => {
                debug!(w, h, "Terminal resized");
                Vec::new()
            }
            AppEvent::Completion(completion) => app.apply(completion),
        };
        spawn_all(dispatches, app, &mut client, &mut client_config, &events);

        if app.should_quit {
            break;
        }
    }

    match app.fatal.take() {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

/// Start a task per dispatch, rebuilding the client whenever the config changed
fn spawn_all(
    dispatches: Vec<Dispatch>,
    app: &mut App,
    client: &mut Option<AzureClient>,
    client_config: &mut Option<crate::config::Config>,
    events: &EventHandler,
) {
    if dispatches.is_empty() {
        return;
    }
    if client_config.as_ref() != Some(&app.config) {
        match AzureClient::new(&app.config.azure_org_url, &app.config.azure_pat) {
            Ok(c) => {
                info!(org_url = %app.config.azure_org_url, "Azure DevOps client ready");
                *client = Some(c);
                *client_config = Some(app.config.clone());
            }
            Err(e) => {
                app.fatal = Some(format!("Failed to create HTTP client: {e}"));
                app.should_quit = true;
                return;
            }
        }
    }
    let Some(client) = client.as_ref() else {
        return;
    };

    for dispatch in dispatches {
        let tx = events.sender();
        let client = client.clone();
        tokio::spawn(async move {
            let Dispatch {
                slot,
                generation,
                request,
            } = dispatch;
            let result = execute(&client, request).await;
            // Receiver gone means the UI is shutting down
            let _ = tx.send(AppEvent::Completion(Completion {
                slot,
                generation,
                result,
            }));
        });
    }
}

/// Run one request against the API
pub async fn execute(client: &AzureClient, request: Request) -> Result<LoadResult, String> {
    let to_string = |e: crate::azure::ApiError| e.to_string();
    match request {
        Request::Projects => client.list_projects().await.map(LoadResult::Projects).map_err(to_string),
        Request::Repos { project } => client
            .list_repositories(&project)
            .await
            .map(LoadResult::Repos)
            .map_err(to_string),
        Request::Pipelines { project, repo_name } => client
            .list_pipelines_for_repo(&project, &repo_name)
            .await
            .map(LoadResult::Pipelines)
            .map_err(to_string),
        Request::Runs { project, pipeline_id } => client
            .list_runs(&project, pipeline_id)
            .await
            .map(LoadResult::Runs)
            .map_err(to_string),
        Request::Timeline {
            project,
            pipeline_id,
            run_id,
        } => {
            let run = client
                .get_run(&project, pipeline_id, run_id)
                .await
                .map_err(to_string)?;
            let records = client.get_timeline(&project, run_id).await.map_err(to_string)?;
            Ok(LoadResult::Timeline { run, records })
        }
        Request::RefreshTimer { run_id } => {
            tokio::time::sleep(REFRESH_INTERVAL).await;
            Ok(LoadResult::RefreshTick { run_id })
        }
        Request::PullRequests { project, repo_id } => client
            .list_pull_requests(&project, &repo_id)
            .await
            .map(LoadResult::PullRequests)
            .map_err(to_string),
        Request::PrDetail {
            project,
            repo_id,
            pr_id,
        } => client
            .get_pull_request_detail(&project, &repo_id, pr_id)
            .await
            .map(LoadResult::PrDetail)
            .map_err(to_string),
        Request::Branches { project, repo_id } => client
            .list_branches(&project, &repo_id)
            .await
            .map(LoadResult::Branches)
            .map_err(to_string),
        Request::Users => client.list_users().await.map(LoadResult::Users).map_err(to_string),
        Request::Vote {
            project,
            repo_id,
            pr_id,
            vote,
        } => {
            let verb = if vote == vote::REJECT { "decline" } else { "approve" };
            match client.approve_pr(&project, &repo_id, pr_id, vote, None).await {
                Ok(()) => Ok(LoadResult::PrAction {
                    pr_id,
                    message: format!("PR #{pr_id} {verb}d"),
                }),
                Err(e) => {
                    warn!(pr_id, error = %e, "Vote failed");
                    Err(format!("Failed to {verb} PR: {e}"))
                }
            }
        }
        Request::Complete {
            project,
            repo_id,
            pr_id,
            last_merge_source_commit,
            options,
        } => {
            let bypass = options.bypass_policy;
            match client
                .complete_pr(
                    &project,
                    &repo_id,
                    pr_id,
                    last_merge_source_commit.as_deref(),
                    &options,
                )
                .await
            {
                Ok(_) if bypass => Ok(LoadResult::PrAction {
                    pr_id,
                    message: format!("PR #{pr_id} completed with policy override"),
                }),
                Ok(_) => Ok(LoadResult::PrAction {
                    pr_id,
                    message: format!("PR #{pr_id} completed"),
                }),
                Err(e) => {
                    warn!(pr_id, bypass, error = %e, "Completion failed");
                    Err(format!("Failed to complete PR: {e}"))
                }
            }
        }
        Request::CreatePr {
            project,
            repo_id,
            pr,
        } => client
            .create_pr(&project, &repo_id, &pr)
            .await
            .map(LoadResult::PrCreated)
            .map_err(to_string),
        Request::Autodetect => {
            let result = autodetect::detect_project_and_repo(client.org_url(), client).await;
            Ok(LoadResult::Autodetect(result))
        }
        Request::SaveConfig(config) => {
            let path = tokio::task::spawn_blocking(move || config.save())
                .await
                .map_err(|e| e.to_string())?
                .map_err(|e| format!("{e:#}"))?;
            info!(path = %path.display(), "Config saved");
            Ok(LoadResult::ConfigSaved(path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::CompletionOptions;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> AzureClient {
        AzureClient::new(&format!("{}/acme", server.uri()), "pat").unwrap()
    }

    #[tokio::test]
    async fn test_pipelines_are_scoped_to_repo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/pipelines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": 1, "name": "ci" },
                    { "id": 2, "name": "api-service" }
                ]
            })))
            .mount(&server)
            .await;
        let client = client(&server).await;

        let request = |repo_name: &str| Request::Pipelines {
            project: "Widgets".to_string(),
            repo_name: repo_name.to_string(),
        };

        match execute(&client, request("api-service")).await {
            Ok(LoadResult::Pipelines(pipelines)) => {
                assert_eq!(pipelines.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2])
            }
            other => panic!("unexpected result: {other:?}"),
        }
        match execute(&client, request("web")).await {
            Ok(LoadResult::Pipelines(pipelines)) => {
                assert!(pipelines.is_empty(), "No match stays empty instead of listing everything")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeline_carries_fresh_run_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/pipelines/3/runs/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42, "name": "20261019.1", "state": "completed", "result": "failed"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/build/builds/42/timeline"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "id": "a", "name": "Build", "order": 1 }]
            })))
            .mount(&server)
            .await;

        let result = execute(
            &client(&server).await,
            Request::Timeline {
                project: "Widgets".to_string(),
                pipeline_id: 3,
                run_id: 42,
            },
        )
        .await;

        match result {
            Ok(LoadResult::Timeline { run, records }) => {
                assert!(!run.state.is_active());
                assert_eq!(run.result.as_deref(), Some("failed"));
                assert_eq!(records.len(), 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_completion_message() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/acme/Widgets/_apis/git/repositories/r1/pullrequests/7"))
            .and(query_param("api-version", "7.1"))
            .respond_with(ResponseTemplate::new(409).set_body_string("policy rejected"))
            .mount(&server)
            .await;

        let result = execute(
            &client(&server).await,
            Request::Complete {
                project: "Widgets".to_string(),
                repo_id: "r1".to_string(),
                pr_id: 7,
                last_merge_source_commit: None,
                options: CompletionOptions::standard(),
            },
        )
        .await;

        let message = result.unwrap_err();
        assert!(message.starts_with("Failed to complete PR"), "got: {message}");
    }
}
