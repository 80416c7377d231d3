use std::{env, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use eframe::{
    App, CreationContext, Frame,
    egui::{self, Color32, Context, Layout, RichText, Visuals},
};
use egui_extras::{Column, TableBuilder};
use tracing::{debug, info, warn};

use crate::{
    config::DashboardConfig,
    domain::{CheckState, DashboardSnapshot, Issue, Label, Mergeable, PullRequest, UserProfile},
    focus::{FocusError, FocusSource, FocusStore, MAX_FOCUS_ITEMS},
    github::{self, GitHubViewerSource},
    preferences::PlayerPreferences,
    refresh::{JobOutcome, PendingJob, RefreshScheduler},
    session::{ProfileSource, RestoreOutcome, RestoreStep, Session, SessionStore},
    storage::{LocalStorage, STORAGE_DIR_NAME, StorageError},
    views::{self, PrStatus, UNKNOWN_AUTHOR},
};

pub const APP_NAME: &str = "My GitHub Workday";

const ACCENT: Color32 = Color32::from_rgb(76, 161, 163);
const DIRECT_COLOR: Color32 = Color32::from_rgb(76, 175, 80);

pub struct WorkdayApp {
    config: DashboardConfig,
    session: SessionStore,
    focus: FocusStore,
    player: PlayerPreferences,
    login_form: LoginForm,
    focus_form: FocusForm,
    dashboard: DashboardState,
    pending_login: Option<PendingJob<(String, UserProfile)>>,
    pending_restore: Option<PendingRestore>,
    storage_warning: Option<String>,
    global_error: Option<String>,
    auto_refresh: RefreshScheduler,
}

impl WorkdayApp {
    pub fn new(_cc: &CreationContext<'_>, config: DashboardConfig) -> Result<Self, StorageError> {
        let (storage, storage_warning) = open_storage(&config)?;
        info!(dir = %storage.root().display(), "using local storage");

        let mut app = Self {
            session: SessionStore::new(storage.clone()),
            focus: FocusStore::load(storage.clone()),
            player: PlayerPreferences::load(storage),
            login_form: LoginForm::default(),
            focus_form: FocusForm::default(),
            dashboard: DashboardState::default(),
            pending_login: None,
            pending_restore: None,
            storage_warning,
            global_error: None,
            auto_refresh: RefreshScheduler::new(config.poll_interval()),
            config,
        };

        app.restore_session();
        Ok(app)
    }

    // Only a saved token without a readable profile reaches the network;
    // that fetch runs in the background while the window shows a spinner.
    fn restore_session(&mut self) {
        match self.session.begin_restore() {
            Ok(RestoreStep::Done(outcome)) => self.apply_restore_outcome(outcome),
            Ok(RestoreStep::NeedsProfile(token)) => {
                let endpoint = self.config.api_url.clone();
                let fetch_token = token.clone();
                let job = PendingJob::spawn(move || {
                    let client = github::build_client()?;
                    GitHubViewerSource::new(&client, &endpoint).fetch_profile(&fetch_token)
                });
                self.pending_restore = Some(PendingRestore { token, job });
            }
            Err(err) => {
                self.storage_warning = Some(format!("Failed to restore saved session: {err}"));
            }
        }
    }

    fn finish_restore(&mut self, token: String, fetched: JobOutcome<UserProfile>) {
        match self.session.finish_restore(token, fetched) {
            Ok(outcome) => self.apply_restore_outcome(outcome),
            Err(err) => {
                self.storage_warning = Some(format!("Failed to restore saved session: {err}"));
            }
        }
    }

    fn apply_restore_outcome(&mut self, outcome: RestoreOutcome) {
        match outcome {
            RestoreOutcome::Rejected(reason) => {
                self.login_form.error = Some(format!("Saved token was rejected: {reason}"));
            }
            outcome => debug!(?outcome, "session restore finished"),
        }
        if self.session.current().is_some() {
            self.auto_refresh.start();
        }
    }

    fn submit_login(&mut self) {
        let token = self.login_form.token.trim().to_owned();
        if token.is_empty() {
            self.login_form.error = Some("A personal access token is required.".to_owned());
            return;
        }

        let endpoint = self.config.api_url.clone();
        self.login_form.error = None;
        self.pending_login = Some(PendingJob::spawn(move || {
            let client = github::build_client()?;
            let profile = github::fetch_viewer(&client, &endpoint, &token)?;
            Ok((token, profile))
        }));
    }

    fn logout(&mut self) {
        if let Err(err) = self.session.clear() {
            self.global_error = Some(format!("Failed to clear saved session: {err}"));
        }
        self.auto_refresh.stop();
        self.dashboard = DashboardState::default();
    }

    fn request_refresh(&mut self) {
        if let Some(session) = self.session.current() {
            self.dashboard.start_refresh(session, &self.config.api_url);
            self.auto_refresh.mark_triggered();
        }
    }

    fn poll_jobs(&mut self) {
        if let Some(fetched) = self
            .pending_restore
            .as_ref()
            .and_then(|restore| restore.job.try_take())
            && let Some(restore) = self.pending_restore.take()
        {
            self.finish_restore(restore.token, fetched);
        }

        if let Some(job) = &self.pending_login
            && let Some(result) = job.try_take()
        {
            self.pending_login = None;
            match result {
                Ok((token, profile)) => match self.session.set_session(token, profile) {
                    Ok(()) => {
                        self.login_form = LoginForm::default();
                        self.auto_refresh.start();
                    }
                    Err(err) => {
                        self.login_form.error = Some(format!("Unable to save session: {err}"));
                    }
                },
                Err(err) => {
                    self.login_form.error = Some(format!("Authentication failed: {err}"));
                }
            }
        }

        self.dashboard.poll_job();
    }

    fn maybe_auto_refresh(&mut self) {
        if !self.auto_refresh.should_trigger() {
            return;
        }
        let Some(session) = self.session.current() else {
            return;
        };

        if self.dashboard.pending_job.is_none() {
            debug!("poll interval elapsed; refreshing dashboard");
            self.dashboard.start_refresh(session, &self.config.api_url);
        }
        self.auto_refresh.mark_triggered();
    }

    fn add_focus_url(&mut self) {
        match self
            .focus
            .add_url(&self.focus_form.url, Some(&self.focus_form.title))
        {
            Ok(_) => self.focus_form = FocusForm::default(),
            Err(FocusError::InvalidUrl(_)) => {
                self.focus_form.error =
                    Some("Please enter a valid GitHub PR or issue URL.".to_owned());
            }
            Err(err) => self.focus_form.error = Some(err.to_string()),
        }
    }

    fn apply(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::TogglePin { title, url } => {
                if let Err(err) = self.focus.toggle(FocusSource {
                    title: &title,
                    url: &url,
                }) {
                    self.global_error = Some(format!("Unable to update focus list: {err}"));
                }
            }
            DashboardAction::FilterAuthor(login) => self.dashboard.author_filter = login,
            DashboardAction::Retry => self.request_refresh(),
        }
    }

    fn render_login(&mut self, ui: &mut egui::Ui) {
        let mut submit = false;
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading(APP_NAME);
            ui.label(
                "Your single-pane dashboard for GitHub activity. \
                 See what needs your attention, track your PRs, and stay focused.",
            );
            ui.add_space(16.0);

            if let Some(warning) = &self.storage_warning {
                ui.colored_label(ui.visuals().warn_fg_color, warning);
            }

            ui.label("Personal access token (scopes: repo, read:user)");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.login_form.token)
                    .password(true)
                    .hint_text("ghp_...")
                    .desired_width(320.0),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let busy = self.pending_login.is_some();
            let ready = !busy && !self.login_form.token.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new("Sign in")).clicked() || (ready && entered) {
                submit = true;
            }
            if busy {
                ui.horizontal(|row| {
                    row.spinner();
                    row.label("Validating token...");
                });
            }

            if let Some(error) = &self.login_form.error {
                ui.colored_label(ui.visuals().error_fg_color, error);
            }
        });

        if submit {
            self.submit_login();
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.current() else {
            return;
        };
        let signed_in_as = format!("{} ({})", session.profile.name, session.profile.login);
        let busy = self.dashboard.pending_job.is_some();

        let mut refresh = false;
        let mut logout = false;
        ui.horizontal(|row| {
            row.heading(APP_NAME);
            row.separator();
            row.label(signed_in_as);
            if let Some(snapshot) = &self.dashboard.snapshot {
                row.weak(format!(
                    "Last synced {} UTC",
                    snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            if busy {
                row.spinner();
            } else if let Some(next) = self.auto_refresh.time_until_next() {
                row.weak(format!("next refresh in {}s", next.as_secs()));
            }
            row.with_layout(Layout::right_to_left(egui::Align::Center), |lane| {
                if lane.button("Log out").clicked() {
                    logout = true;
                }
                if lane
                    .add_enabled(!busy, egui::Button::new("Refresh"))
                    .clicked()
                {
                    refresh = true;
                }
            });
        });

        if refresh {
            self.request_refresh();
        }
        if logout {
            self.logout();
        }
    }

    fn render_side_panel(&mut self, ui: &mut egui::Ui) {
        self.render_focus(ui);
        ui.separator();
        self.render_player(ui);
    }

    fn render_focus(&mut self, ui: &mut egui::Ui) {
        ui.heading("Focus");
        ui.weak(format!(
            "Pin up to {MAX_FOCUS_ITEMS} important PRs or issues to stay focused"
        ));
        ui.add_space(4.0);

        let now = Utc::now();
        let mut remove_id = None;
        if self.focus.items().is_empty() {
            ui.weak("No focus items yet.");
        } else {
            ui.push_id("focus_table", |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::initial(50.0))
                    .column(Column::remainder())
                    .column(Column::initial(60.0))
                    .body(|mut body| {
                        for item in self.focus.items() {
                            body.row(36.0, |mut row| {
                                row.col(|ui| {
                                    ui.label(RichText::new(item.kind.label()).small().strong());
                                });
                                row.col(|ui| {
                                    ui.hyperlink_to(&item.title, &item.url);
                                    ui.small(format!(
                                        "{} • added {}",
                                        item.repository,
                                        relative_time(item.added_at, now)
                                    ));
                                });
                                row.col(|ui| {
                                    if ui.small_button("Remove").clicked() {
                                        remove_id = Some(item.id.clone());
                                    }
                                });
                            });
                        }
                    });
            });
        }

        if let Some(id) = remove_id
            && let Err(err) = self.focus.remove(&id)
        {
            self.global_error = Some(format!("Unable to update focus list: {err}"));
        }

        ui.separator();
        ui.label("Add by URL");
        ui.add(
            egui::TextEdit::singleline(&mut self.focus_form.url)
                .hint_text("https://github.com/owner/repo/pull/123"),
        );
        ui.add(
            egui::TextEdit::singleline(&mut self.focus_form.title)
                .hint_text("Custom title (optional)"),
        );

        let can_add = !self.focus_form.url.trim().is_empty() && !self.focus.is_full();
        if ui
            .add_enabled(can_add, egui::Button::new("Add to focus"))
            .clicked()
        {
            self.add_focus_url();
        }
        if self.focus.is_full() {
            ui.weak("Focus list is full; remove an item to add another.");
        }
        if let Some(error) = &self.focus_form.error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }
    }

    fn render_player(&mut self, ui: &mut egui::Ui) {
        ui.heading("Focus music");

        let mut muted = self.player.muted();
        let mut volume = self.player.volume();
        let (mute_changed, volume_changed) = ui
            .horizontal(|row| {
                let mute = row.checkbox(&mut muted, "Muted").changed();
                let slider = row
                    .add_enabled(
                        !muted,
                        egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false),
                    )
                    .changed();
                (mute, slider)
            })
            .inner;

        let mut result = Ok(());
        if mute_changed {
            result = self.player.set_muted(muted);
        }
        if volume_changed && result.is_ok() {
            result = self.player.set_volume(volume);
        }
        if let Err(err) = result {
            self.global_error = Some(format!("Unable to save player settings: {err}"));
        }

        ui.weak(format!(
            "Output level {:.0}%",
            self.player.effective_volume() * 100.0
        ));
    }

    fn render_dashboard(&mut self, ui: &mut egui::Ui) {
        self.render_global_error(ui);

        let mut actions = Vec::new();
        if let Some(error) = &self.dashboard.last_error {
            ui.horizontal(|row| {
                row.colored_label(row.visuals().error_fg_color, &error.message);
                if row.button("Retry").clicked() {
                    actions.push(DashboardAction::Retry);
                }
            });
            if error.auth_failure {
                ui.weak("Check that your token is still valid, or log out and sign in again.");
            }
            ui.add_space(8.0);
        }

        let Some(snapshot) = &self.dashboard.snapshot else {
            ui.centered_and_justified(|center| {
                if self.dashboard.pending_job.is_some() {
                    center.label("Loading your workday...");
                } else {
                    center.label("No data fetched yet.");
                }
            });
            for action in actions {
                self.apply(action);
            }
            return;
        };

        let viewer = snapshot.viewer.login.as_str();
        let author_filter = self.dashboard.author_filter.as_deref();
        let in_flight_tab = &mut self.dashboard.in_flight_tab;
        let focus = &self.focus;
        let now = Utc::now();
        ui.columns(3, |columns| {
            actions.extend(render_triage(
                &mut columns[0],
                snapshot,
                viewer,
                author_filter,
                now,
            ));
            actions.extend(render_in_flight(
                &mut columns[1],
                snapshot,
                in_flight_tab,
                focus,
                now,
            ));
            render_radar(&mut columns[2], snapshot, viewer, now);
        });

        for action in actions {
            self.apply(action);
        }
    }

    fn render_global_error(&self, ui: &mut egui::Ui) {
        if let Some(warning) = &self.storage_warning {
            ui.colored_label(ui.visuals().warn_fg_color, warning);
        }
        if let Some(error) = &self.global_error {
            ui.colored_label(ui.visuals().error_fg_color, error);
            ui.add_space(8.0);
        }
    }
}

fn open_storage(config: &DashboardConfig) -> Result<(LocalStorage, Option<String>), StorageError> {
    match LocalStorage::initialize(config.storage_dir.as_deref()) {
        Ok(storage) => Ok((storage, None)),
        Err(err) => {
            let fallback = env::temp_dir().join(STORAGE_DIR_NAME);
            warn!(error = %err, fallback = %fallback.display(), "local storage unavailable");
            let warning = format!(
                "Local storage is unavailable ({err}); saving to {} for now.",
                fallback.display()
            );
            Ok((LocalStorage::at(fallback)?, Some(warning)))
        }
    }
}

impl App for WorkdayApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        self.poll_jobs();
        self.maybe_auto_refresh();

        if self.pending_restore.is_some() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|center| {
                    center.horizontal(|row| {
                        row.spinner();
                        row.label("Restoring session...");
                    });
                });
            });
        } else if self.session.current().is_none() {
            egui::CentralPanel::default().show(ctx, |ui| self.render_login(ui));
        } else {
            egui::TopBottomPanel::top("top_bar").show(ctx, |ui| self.render_top_bar(ui));
            egui::SidePanel::right("focus_panel")
                .default_width(300.0)
                .show(ctx, |ui| self.render_side_panel(ui));
            egui::CentralPanel::default().show(ctx, |ui| self.render_dashboard(ui));
        }

        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

// -----------------------------------------------------------------------------
// Dashboard state & background jobs
// -----------------------------------------------------------------------------

#[derive(Default)]
struct DashboardState {
    snapshot: Option<DashboardSnapshot>,
    last_error: Option<DashboardError>,
    pending_job: Option<PendingJob<DashboardSnapshot>>,
    author_filter: Option<String>,
    in_flight_tab: InFlightTab,
}

impl DashboardState {
    fn start_refresh(&mut self, session: &Session, endpoint: &str) {
        if self.pending_job.is_some() {
            return;
        }
        let token = session.token.clone();
        let endpoint = endpoint.to_owned();
        self.last_error = None;
        self.pending_job = Some(PendingJob::spawn(move || {
            let client = github::build_client()?;
            github::fetch_dashboard(&client, &endpoint, &token)
        }));
    }

    fn poll_job(&mut self) {
        if let Some(job) = &self.pending_job
            && let Some(result) = job.try_take()
        {
            self.pending_job = None;
            match result {
                Ok(snapshot) => {
                    info!(
                        to_review = snapshot.prs_to_review.len(),
                        mine = snapshot.my_open_prs.len(),
                        involved = snapshot.involved_prs.len(),
                        issues = snapshot.assigned_issues.len(),
                        "dashboard refreshed"
                    );
                    self.snapshot = Some(snapshot);
                    self.last_error = None;
                }
                Err(err) => {
                    warn!(error = %err, "dashboard refresh failed");
                    self.last_error = Some(DashboardError {
                        auth_failure: err.is_auth_failure(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

struct PendingRestore {
    token: String,
    job: PendingJob<UserProfile>,
}

struct DashboardError {
    message: String,
    auth_failure: bool,
}

// -----------------------------------------------------------------------------
// Widgets
// -----------------------------------------------------------------------------

fn render_triage(
    ui: &mut egui::Ui,
    snapshot: &DashboardSnapshot,
    viewer: &str,
    author_filter: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<DashboardAction> {
    let mut actions = Vec::new();
    ui.heading("Triage");
    ui.weak("Pull requests waiting for your review");
    ui.separator();

    let prs = &snapshot.prs_to_review;
    if prs.is_empty() {
        ui.weak("No PRs waiting for your review! 🎉");
        return actions;
    }

    let tallies = views::tally_by_author(prs);
    ui.horizontal_wrapped(|row| {
        for tally in &tallies {
            let selected = author_filter == Some(tally.login);
            let button = egui::Button::new(format!("{} ({})", tally.login, tally.count))
                .selected(selected);
            if row.add(button).clicked() {
                let next = if selected {
                    None
                } else {
                    Some(tally.login.to_owned())
                };
                actions.push(DashboardAction::FilterAuthor(next));
            }
        }
    });
    if let Some(login) = author_filter {
        ui.horizontal(|row| {
            row.label(format!("Showing PRs by {login}"));
            if row.small_button("Clear").clicked() {
                actions.push(DashboardAction::FilterAuthor(None));
            }
        });
    }
    ui.add_space(4.0);

    let filtered = views::filter_by_author(prs, author_filter);
    let groups = views::group_by_assignment(filtered, viewer);
    egui::ScrollArea::vertical()
        .id_salt("triage_scroll")
        .show(ui, |ui| {
            if groups.is_empty() {
                ui.weak("No matches for the selected author.");
            }
            for group in &groups {
                let mut title = RichText::new(format!(
                    "{} ({})",
                    group.label(),
                    group.pull_requests.len()
                ))
                .strong();
                if group.is_direct() {
                    title = title.color(DIRECT_COLOR);
                }
                egui::CollapsingHeader::new(title)
                    .id_salt(&group.target)
                    .default_open(group.is_direct())
                    .show(ui, |ui| {
                        ui.horizontal(|row| {
                            if group.is_direct() {
                                row.label(tag("HIGH PRIORITY", DIRECT_COLOR).strong());
                            }
                            if let Some(updated) = group.last_updated() {
                                row.weak(format!("Updated {}", relative_time(updated, now)));
                            }
                        });
                        for pr in &group.pull_requests {
                            ui.push_id(&pr.id, |ui| draw_pr_summary(ui, pr, now, 3));
                            ui.separator();
                        }
                    });
            }
        });
    actions
}

fn render_in_flight(
    ui: &mut egui::Ui,
    snapshot: &DashboardSnapshot,
    tab: &mut InFlightTab,
    focus: &FocusStore,
    now: DateTime<Utc>,
) -> Vec<DashboardAction> {
    let mut actions = Vec::new();
    ui.heading("My stuff");
    ui.horizontal(|row| {
        row.selectable_value(
            tab,
            InFlightTab::PullRequests,
            format!("Pull requests ({})", snapshot.my_open_prs.len()),
        );
        row.selectable_value(
            tab,
            InFlightTab::Issues,
            format!("Assigned issues ({})", snapshot.assigned_issues.len()),
        );
    });
    ui.separator();

    match *tab {
        InFlightTab::PullRequests => {
            draw_my_pull_requests(ui, &snapshot.my_open_prs, focus, now, &mut actions)
        }
        InFlightTab::Issues => {
            draw_assigned_issues(ui, &snapshot.assigned_issues, focus, now, &mut actions)
        }
    }
    actions
}

fn render_radar(ui: &mut egui::Ui, snapshot: &DashboardSnapshot, viewer: &str, now: DateTime<Utc>) {
    ui.heading("On my radar");
    ui.weak("PRs you've reviewed or contributed to, with new activity highlighted");
    ui.separator();

    let entries = views::compute_radar(&snapshot.involved_prs, viewer);
    let fresh = views::count_new_commits(&entries);
    if fresh > 0 {
        let verb = if fresh == 1 { "PR has" } else { "PRs have" };
        ui.colored_label(
            ACCENT,
            format!("{fresh} {verb} new commits since your last review!"),
        );
    }
    if entries.is_empty() {
        ui.weak("No PRs you're involved in.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("radar_scroll")
        .show(ui, |ui| {
            for entry in &entries {
                let pr = entry.pull_request;
                ui.push_id(&pr.id, |ui| {
                    ui.horizontal(|row| {
                        let involvement = row.label(tag(entry.involvement.label(), ACCENT));
                        if let Some(comment) = pr.comments.last() {
                            involvement.on_hover_text(format!(
                                "Latest comment by {} {}: {}",
                                comment
                                    .author
                                    .as_ref()
                                    .map_or(UNKNOWN_AUTHOR, |author| author.login.as_str()),
                                relative_time(comment.created_at, now),
                                comment.body
                            ));
                        }
                        if entry.has_new_commits {
                            row.label(
                                RichText::new("New commits!")
                                    .small()
                                    .strong()
                                    .color(Color32::WHITE)
                                    .background_color(ACCENT),
                            );
                        }
                    });
                    draw_pr_summary(ui, pr, now, 2);
                    if let Some(review) = views::viewer_last_review(pr, viewer) {
                        ui.weak(format!(
                            "You reviewed {}",
                            relative_time(review.activity_at(), now)
                        ));
                    }
                });
                ui.separator();
            }
        });
}

fn draw_my_pull_requests(
    ui: &mut egui::Ui,
    prs: &[PullRequest],
    focus: &FocusStore,
    now: DateTime<Utc>,
    actions: &mut Vec<DashboardAction>,
) {
    if prs.is_empty() {
        ui.weak("No open pull requests.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("my_prs_scroll")
        .show(ui, |ui| {
            for pr in prs {
                ui.push_id(&pr.id, |ui| {
                    ui.horizontal(|row| {
                        let status = views::pr_status(pr);
                        let color = status_color(row.visuals(), status);
                        row.label(tag(status.label(), color).strong());
                        if let Some(action) = pin_button(row, focus, &pr.title, &pr.url) {
                            actions.push(action);
                        }
                    });
                    draw_pr_summary(ui, pr, now, 2);
                });
                ui.separator();
            }
        });
}

fn draw_assigned_issues(
    ui: &mut egui::Ui,
    issues: &[Issue],
    focus: &FocusStore,
    now: DateTime<Utc>,
    actions: &mut Vec<DashboardAction>,
) {
    if issues.is_empty() {
        ui.weak("No assigned issues.");
        return;
    }

    ui.push_id("assigned_issues_table", |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::initial(110.0).resizable(true))
            .column(Column::remainder())
            .column(Column::initial(90.0))
            .column(Column::initial(50.0))
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Repository");
                });
                header.col(|ui| {
                    ui.strong("Issue");
                });
                header.col(|ui| {
                    ui.strong("Opened");
                });
                header.col(|ui| {
                    ui.strong("Focus");
                });
            })
            .body(|mut body| {
                for issue in issues {
                    body.row(48.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&issue.repository.name_with_owner);
                        });
                        row.col(|ui| {
                            ui.hyperlink_to(&issue.title, &issue.url);
                            ui.small(issue_caption(issue, now));
                            ui.horizontal(|labels| {
                                for label in issue.labels.iter().take(2) {
                                    draw_label(labels, label);
                                }
                            });
                        });
                        row.col(|ui| {
                            ui.label(relative_time(issue.created_at, now));
                        });
                        row.col(|ui| {
                            ui.push_id(&issue.id, |ui| {
                                if let Some(action) =
                                    pin_button(ui, focus, &issue.title, &issue.url)
                                {
                                    actions.push(action);
                                }
                            });
                        });
                    });
                }
            });
    });
}

// -----------------------------------------------------------------------------
// UI helpers
// -----------------------------------------------------------------------------

fn draw_pr_summary(ui: &mut egui::Ui, pr: &PullRequest, now: DateTime<Utc>, label_limit: usize) {
    ui.horizontal_wrapped(|row| {
        row.hyperlink_to(RichText::new(&pr.title).strong(), &pr.url);
        if pr.is_draft {
            let color = row.visuals().weak_text_color();
            row.label(tag("Draft", color));
        }
        if views::is_stale(pr, now) {
            let color = row.visuals().error_fg_color;
            row.label(tag("STALE", color).strong());
        }
        if pr.mergeable == Mergeable::Conflicting {
            let color = row.visuals().warn_fg_color;
            row.label(tag("Conflicts", color));
        }
    });
    ui.small(format!(
        "#{} {} • by {} • updated {}",
        pr.number,
        pr.repository.name_with_owner,
        pr.author_login().unwrap_or(UNKNOWN_AUTHOR),
        relative_time(pr.updated_at, now)
    ));
    ui.horizontal_wrapped(|row| {
        draw_check_state(row, pr);
        for label in pr.labels.iter().take(label_limit) {
            draw_label(row, label);
        }
    });
}

fn draw_check_state(ui: &mut egui::Ui, pr: &PullRequest) {
    let state = views::latest_check_state(pr);
    let visuals = ui.visuals();
    let color = match state {
        Some(CheckState::Success) => DIRECT_COLOR,
        Some(state) if state.is_failing() => visuals.error_fg_color,
        Some(_) => visuals.warn_fg_color,
        None => visuals.weak_text_color(),
    };
    let response = ui.label(tag(state.map_or("Unknown", |state| state.label()), color));
    if let Some(commit) = pr.commits.first() {
        response.on_hover_text(format!("Head commit {}", short_oid(&commit.oid)));
    }
}

fn draw_label(ui: &mut egui::Ui, label: &Label) {
    let background = Color32::from_hex(&format!("#{}", label.color)).unwrap_or(Color32::GRAY);
    ui.label(
        RichText::new(&label.name)
            .small()
            .color(Color32::WHITE)
            .background_color(background),
    );
}

fn pin_button(
    ui: &mut egui::Ui,
    focus: &FocusStore,
    title: &str,
    url: &str,
) -> Option<DashboardAction> {
    let pinned = focus.contains(url);
    let (text, hint) = if pinned {
        ("Unpin", "Remove from focus")
    } else {
        ("Pin", "Add to focus")
    };
    ui.small_button(text)
        .on_hover_text(hint)
        .clicked()
        .then(|| DashboardAction::TogglePin {
            title: title.to_owned(),
            url: url.to_owned(),
        })
}

fn status_color(visuals: &Visuals, status: PrStatus) -> Color32 {
    match status {
        PrStatus::Approved => DIRECT_COLOR,
        PrStatus::ChangesRequested => visuals.error_fg_color,
        PrStatus::InReview => ACCENT,
        PrStatus::Draft => visuals.weak_text_color(),
        PrStatus::AwaitingReview => visuals.warn_fg_color,
    }
}

fn tag(text: &str, color: Color32) -> RichText {
    RichText::new(text).small().color(color)
}

fn issue_caption(issue: &Issue, now: DateTime<Utc>) -> String {
    format!(
        "#{} by {} • {} comments • updated {}",
        issue.number,
        issue
            .author
            .as_ref()
            .map_or(UNKNOWN_AUTHOR, |author| author.login.as_str()),
        issue.comment_count,
        relative_time(issue.updated_at, now)
    )
}

fn short_oid(oid: &str) -> &str {
    oid.get(..7).unwrap_or(oid)
}

fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now - at;
    if delta < TimeDelta::minutes(1) {
        return "just now".to_owned();
    }
    if delta < TimeDelta::hours(1) {
        return format!("{} min ago", delta.num_minutes());
    }
    if delta < TimeDelta::days(1) {
        let hours = delta.num_hours();
        return if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        };
    }
    match delta.num_days() {
        1 => "1 day ago".to_owned(),
        days => format!("{days} days ago"),
    }
}

// -----------------------------------------------------------------------------
// Supporting structs
// -----------------------------------------------------------------------------

enum DashboardAction {
    TogglePin { title: String, url: String },
    FilterAuthor(Option<String>),
    Retry,
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
enum InFlightTab {
    #[default]
    PullRequests,
    Issues,
}

#[derive(Default)]
struct LoginForm {
    token: String,
    error: Option<String>,
}

#[derive(Default)]
struct FocusForm {
    url: String,
    title: String,
    error: Option<String>,
}
