//! State machine tests for the TUI App.
//!
//! Each test spawns the stub backend on a separate thread (the App owns its own
//! tokio runtime, so the server must live in another thread's runtime), builds
//! an App over a real HttpService, and drives it with key events, `tick` and
//! `wait_idle`.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use research_core::auth::EmailAvailability;
use research_core::{Location, Route, RouteParams};
use research_service::test_helpers::{spawn_stub_backend, StubBackend, STUB_OTP, TAKEN_EMAIL};
use research_service::HttpService;
use research_tui::app::{App, AppOptions};
use research_tui::screens::dashboard::DashboardScreen;
use research_tui::screens::Screen;
use serde_json::json;
use tempfile::TempDir;

const SETTLE: Duration = Duration::from_secs(5);

/// Spawn the stub backend on a separate thread and hand it back.
fn spawn_stub() -> StubBackend {
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let stub = spawn_stub_backend().await;
            tx.send(stub).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn char_key(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}

fn type_str(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_key(char_key(c));
    }
}

fn make_app_at(stub: &StubBackend, location: Location, dir: &Path) -> App {
    let svc = HttpService::new(&stub.base_url).unwrap();
    let options = AppOptions {
        location,
        download_dir: dir.to_path_buf(),
    };
    App::new(Arc::new(svc), options).unwrap()
}

/// A fresh app whose session check has already answered.
fn make_app() -> (StubBackend, App, TempDir) {
    let stub = spawn_stub();
    let dir = tempfile::tempdir().unwrap();
    let mut app = make_app_at(&stub, Location::default(), dir.path());
    assert!(app.wait_idle(SETTLE));
    (stub, app, dir)
}

fn sign_in(app: &mut App, email: &str, password: &str) {
    app.handle_key(key(KeyCode::F(2)));
    type_str(app, email);
    app.handle_key(key(KeyCode::Tab));
    type_str(app, password);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));
}

/// An app signed in and showing the dashboard with its history loaded.
fn signed_in_app() -> (StubBackend, App, TempDir) {
    let (stub, mut app, dir) = make_app();
    stub.add_user("ada@example.com", "Secret123");
    sign_in(&mut app, "ada@example.com", "Secret123");
    app.tick(Instant::now() + Duration::from_millis(400));
    assert!(app.wait_idle(SETTLE));
    assert_eq!(app.route(), Route::Dashboard);
    (stub, app, dir)
}

fn dashboard(app: &App) -> &DashboardScreen {
    match app.screen() {
        Screen::Dashboard(d) => d,
        _ => panic!("expected dashboard screen"),
    }
}

fn ask(app: &mut App, query: &str) {
    type_str(app, query);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));
}

fn open_register(app: &mut App) {
    app.handle_key(key(KeyCode::F(1)));
    assert_eq!(app.route(), Route::Register);
}

fn fill_register(app: &mut App, username: &str, email: &str, password: &str) {
    type_str(app, username);
    app.handle_key(key(KeyCode::Tab));
    type_str(app, email);
    app.handle_key(key(KeyCode::Tab));
    type_str(app, password);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));
}

fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

fn draw(app: &App) -> String {
    let backend = TestBackend::new(120, 40);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|frame| app.render(frame)).unwrap();
    buffer_text(&terminal)
}

// ---- Session check ----

#[test]
fn starts_checking_then_resolves_unauthenticated() {
    let stub = spawn_stub();
    let dir = tempfile::tempdir().unwrap();
    let mut app = make_app_at(&stub, Location::default(), dir.path());

    assert!(app.session().checking);
    assert_eq!(app.route(), Route::Dashboard);
    assert!(matches!(app.screen(), Screen::Pending));
    assert!(draw(&app).contains("Checking authentication..."));

    assert!(app.wait_idle(SETTLE));
    assert!(!app.session().checking);
    assert!(!app.session().authenticated);
    assert!(matches!(app.screen(), Screen::SignInRequired));
    assert_eq!(stub.calls_to("check-token").len(), 1);
}

#[test]
fn existing_session_opens_dashboard() {
    let stub = spawn_stub();
    stub.assume_signed_in();
    let dir = tempfile::tempdir().unwrap();
    let mut app = make_app_at(&stub, Location::default(), dir.path());
    assert!(matches!(app.screen(), Screen::Pending));

    assert!(app.wait_idle(SETTLE));
    assert!(app.session().authenticated);
    assert!(!app.session().checking);
    assert_eq!(app.route(), Route::Dashboard);
    assert!(matches!(app.screen(), Screen::Dashboard(_)));
    assert_eq!(stub.calls_to("history").len(), 1);
    assert!(draw(&app).contains("(Signed in)"));
}

#[test]
fn navigation_keys_work_while_checking() {
    let stub = spawn_stub();
    let dir = tempfile::tempdir().unwrap();
    let mut app = make_app_at(&stub, Location::default(), dir.path());

    app.handle_key(key(KeyCode::F(1)));
    assert_eq!(app.route(), Route::Register);
    assert!(draw(&app).contains("Checking authentication..."));

    assert!(app.wait_idle(SETTLE));
    assert!(matches!(app.screen(), Screen::Register(_)));
}

#[test]
fn link_with_token_opens_verify() {
    let stub = spawn_stub();
    let dir = tempfile::tempdir().unwrap();
    let location = Location::parse("http://localhost:5173/verify?token=abc123").unwrap();
    let app = make_app_at(&stub, location, dir.path());

    assert_eq!(app.route(), Route::Verify);
    assert_eq!(app.params().token.as_deref(), Some("abc123"));
    assert_eq!(app.location().token().as_deref(), Some("abc123"));
}

#[test]
fn navigate_mirrors_token_only_for_verify() {
    let (_stub, mut app, _dir) = make_app();

    app.navigate(Route::Verify, RouteParams::with_token("abc123"));
    assert_eq!(app.location().token().as_deref(), Some("abc123"));
    assert!(app.location().as_str().ends_with("?token=abc123"));

    app.navigate(Route::Signin, RouteParams::with_token("ignored"));
    assert_eq!(app.location().token(), None);
    assert!(!app.location().as_str().contains("token="));
}

// ---- Register ----

#[test]
fn register_redirect_navigates_to_verify_with_token() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", "new@example.com", "Secret123");

    assert_eq!(app.route(), Route::Verify);
    let token = app.params().token.clone().expect("token from redirect");
    assert_eq!(app.location().token(), Some(token.clone()));
    assert!(app.location().as_str().contains(&format!("token={token}")));
    assert_eq!(stub.calls_to("register").len(), 1);
}

#[test]
fn register_requires_every_field() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    type_str(&mut app, "ada");
    app.handle_key(key(KeyCode::Enter));

    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(
        screen.errors().global_message().as_deref(),
        Some("Please fill all fields")
    );
    assert!(stub.calls_to("register").is_empty());
}

#[test]
fn register_shows_field_errors() {
    let (_stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", TAKEN_EMAIL, "Secret123");

    assert_eq!(app.route(), Route::Register);
    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(
        screen.errors().field("email"),
        Some(&["Email already registered".to_string()][..])
    );
    assert!(draw(&app).contains("Email already registered"));
}

#[test]
fn register_edit_clears_errors() {
    let (_stub, mut app, _dir) = make_app();
    open_register(&mut app);
    app.handle_key(key(KeyCode::Enter));
    type_str(&mut app, "a");

    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert!(screen.errors().is_empty());
}

#[test]
fn email_edits_within_quiet_period_check_once() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    app.handle_key(key(KeyCode::Tab));

    let t0 = Instant::now();
    for c in "ada@example.co".chars() {
        app.handle_key_at(char_key(c), t0);
    }
    app.tick(t0 + Duration::from_millis(500));
    app.handle_key_at(char_key('m'), t0 + Duration::from_millis(500));
    app.tick(t0 + Duration::from_millis(1000));
    assert!(stub.calls_to("check-email").is_empty());

    app.tick(t0 + Duration::from_millis(1100));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(stub.calls_to("check-email"), vec!["check-email:ada@example.com"]);
    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(screen.availability(), EmailAvailability::Available);
}

#[test]
fn taken_email_is_reported() {
    let (_stub, mut app, _dir) = make_app();
    open_register(&mut app);
    app.handle_key(key(KeyCode::Tab));

    let t0 = Instant::now();
    for c in TAKEN_EMAIL.chars() {
        app.handle_key_at(char_key(c), t0);
    }
    app.tick(t0 + Duration::from_millis(600));
    assert!(app.wait_idle(SETTLE));

    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(screen.availability(), EmailAvailability::Taken);
    assert!(draw(&app).contains("taken"));
}

#[test]
fn failed_availability_check_counts_as_taken() {
    let (stub, mut app, _dir) = make_app();
    stub.break_route("check-email");
    open_register(&mut app);
    app.handle_key(key(KeyCode::Tab));

    let t0 = Instant::now();
    for c in "ada@example.com".chars() {
        app.handle_key_at(char_key(c), t0);
    }
    app.tick(t0 + Duration::from_millis(600));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(stub.calls_to("check-email"), vec!["check-email:ada@example.com"]);
    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(screen.availability(), EmailAvailability::Taken);
}

#[test]
fn stale_availability_result_is_dropped() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    app.handle_key(key(KeyCode::Tab));

    let t0 = Instant::now();
    for c in "ada@example.com".chars() {
        app.handle_key_at(char_key(c), t0);
    }
    app.tick(t0 + Duration::from_millis(600));
    app.handle_key_at(char_key('x'), t0 + Duration::from_millis(700));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(stub.calls_to("check-email").len(), 1);
    let Screen::Register(screen) = app.screen() else {
        panic!("expected register screen");
    };
    assert_eq!(screen.availability(), EmailAvailability::Unknown);
}

#[test]
fn other_fields_do_not_trigger_email_check() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);

    let t0 = Instant::now();
    for c in "ada".chars() {
        app.handle_key_at(char_key(c), t0);
    }
    app.tick(t0 + Duration::from_secs(2));
    assert!(app.wait_idle(SETTLE));
    assert!(stub.calls_to("check-email").is_empty());
}

// ---- OTP verification ----

#[test]
fn otp_success_alerts_and_goes_to_sign_in() {
    let (_stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", "new@example.com", "Secret123");
    assert_eq!(app.route(), Route::Verify);

    type_str(&mut app, STUB_OTP);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(app.alert(), Some("Sign-up successful. Please sign in."));
    assert_eq!(app.route(), Route::Signin);
    assert_eq!(app.location().token(), None);
    assert!(draw(&app).contains("Sign-up successful"));

    // The alert swallows keys until dismissed.
    app.handle_key(char_key('a'));
    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.alert(), None);

    sign_in(&mut app, "", "");
    let Screen::SignIn(screen) = app.screen() else {
        panic!("expected sign-in screen");
    };
    assert_eq!(
        screen.errors().global_message().as_deref(),
        Some("Please enter both email and password")
    );
}

#[test]
fn otp_reply_without_success_shows_its_message() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", "new@example.com", "Secret123");
    stub.set_verify_reply(json!({"message": "Account confirmed"}));

    type_str(&mut app, STUB_OTP);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(app.alert(), Some("Account confirmed"));
    assert_eq!(app.route(), Route::Signin);
}

#[test]
fn otp_reply_without_message_shows_verified() {
    let (stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", "new@example.com", "Secret123");
    stub.set_verify_reply(json!({}));

    type_str(&mut app, STUB_OTP);
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(app.alert(), Some("Verified"));
    assert_eq!(app.route(), Route::Signin);
}

#[test]
fn wrong_otp_stays_on_verify() {
    let (_stub, mut app, _dir) = make_app();
    open_register(&mut app);
    fill_register(&mut app, "ada", "new@example.com", "Secret123");

    type_str(&mut app, "000000");
    app.handle_key(key(KeyCode::Enter));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(app.route(), Route::Verify);
    let Screen::Verify(screen) = app.screen() else {
        panic!("expected verify screen");
    };
    assert_eq!(screen.error().as_deref(), Some("Invalid OTP"));
}

#[test]
fn verify_without_token_never_calls_backend() {
    let (stub, mut app, _dir) = make_app();
    app.navigate(Route::Verify, RouteParams::default());
    type_str(&mut app, STUB_OTP);
    app.handle_key(key(KeyCode::Enter));

    let Screen::Verify(screen) = app.screen() else {
        panic!("expected verify screen");
    };
    assert_eq!(screen.error().as_deref(), Some("Missing token"));
    assert!(stub.calls_to("verify-otp").is_empty());
}

// ---- Sign in ----

#[test]
fn sign_in_shows_message_then_opens_dashboard() {
    let (stub, mut app, _dir) = make_app();
    stub.add_user("ada@example.com", "Secret123");
    sign_in(&mut app, "ada@example.com", "Secret123");

    assert!(app.session().authenticated);
    assert_eq!(app.route(), Route::Signin);
    let Screen::SignIn(screen) = app.screen() else {
        panic!("expected sign-in screen");
    };
    assert_eq!(screen.info(), Some("Signed in successfully"));

    app.tick(Instant::now() + Duration::from_millis(400));
    assert_eq!(app.route(), Route::Dashboard);
    assert!(matches!(app.screen(), Screen::Dashboard(_)));
    assert!(app.wait_idle(SETTLE));
    assert_eq!(stub.calls_to("history").len(), 1);
}

#[test]
fn sign_in_without_success_message_opens_dashboard_at_once() {
    let (stub, mut app, _dir) = make_app();
    stub.add_user("ada@example.com", "Secret123");
    stub.set_signin_reply(json!({"message": "Welcome back"}));
    sign_in(&mut app, "ada@example.com", "Secret123");

    assert!(app.session().authenticated);
    assert_eq!(app.route(), Route::Dashboard);
    assert!(matches!(app.screen(), Screen::Dashboard(_)));
    assert_eq!(stub.calls_to("history").len(), 1);
}

#[test]
fn forgot_password_raises_notice() {
    let (_stub, mut app, _dir) = make_app();
    app.handle_key(key(KeyCode::F(2)));
    app.handle_key(KeyEvent::new(KeyCode::Char('f'), KeyModifiers::CONTROL));

    let notice = app.alert().expect("forgot password notice");
    assert!(notice.starts_with("If you forgot your password"));
    assert!(draw(&app).contains("forgot your password"));

    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.alert(), None);
    assert_eq!(app.route(), Route::Signin);
}

#[test]
fn sign_in_rejection_shows_backend_message() {
    let (_stub, mut app, _dir) = make_app();
    sign_in(&mut app, "nobody@example.com", "wrong");

    assert!(!app.session().authenticated);
    let Screen::SignIn(screen) = app.screen() else {
        panic!("expected sign-in screen");
    };
    assert_eq!(
        screen.errors().global_message().as_deref(),
        Some("Invalid email or password")
    );
}

#[test]
fn leaving_sign_in_drops_pending_redirect() {
    let (stub, mut app, _dir) = make_app();
    stub.add_user("ada@example.com", "Secret123");
    sign_in(&mut app, "ada@example.com", "Secret123");

    app.handle_key(key(KeyCode::F(1)));
    app.tick(Instant::now() + Duration::from_millis(400));
    assert_eq!(app.route(), Route::Register);
}

// ---- Dashboard ----

#[test]
fn unauthenticated_dashboard_offers_sign_in() {
    let (_stub, mut app, _dir) = make_app();
    assert!(matches!(app.screen(), Screen::SignInRequired));
    assert!(draw(&app).contains("You need to sign in"));

    app.handle_key(char_key('s'));
    assert_eq!(app.route(), Route::Signin);

    app.handle_key(key(KeyCode::F(3)));
    app.handle_key(char_key('r'));
    assert_eq!(app.route(), Route::Register);
}

#[test]
fn short_query_is_rejected_locally() {
    let (stub, mut app, _dir) = signed_in_app();
    ask(&mut app, "hi");

    assert_eq!(
        dashboard(&app).error(),
        Some("Query must be at least 5 characters")
    );
    assert!(stub.calls_to("query").is_empty());
}

#[test]
fn query_result_is_shown_and_history_reloaded() {
    let (stub, mut app, _dir) = signed_in_app();
    ask(&mut app, "  What is entanglement?  ");

    let screen = dashboard(&app);
    let result = screen.result().expect("result");
    assert_eq!(result.answer, "Answer to: What is entanglement?");
    assert_eq!(result.summary, "Stub summary");
    assert_eq!(result.papers.len(), 1);
    assert_eq!(screen.query(), "");
    assert_eq!(screen.history().len(), 1);
    assert_eq!(stub.calls_to("query"), vec!["query:What is entanglement?"]);
    assert_eq!(stub.calls_to("history").len(), 2);

    let text = draw(&app);
    assert!(text.contains("Answer to: What is entanglement?"));
    assert!(text.contains("Stub paper"));
}

#[test]
fn history_lists_newest_first() {
    let (_stub, mut app, _dir) = signed_in_app();
    ask(&mut app, "first question");
    ask(&mut app, "second question");

    let titles: Vec<&str> = dashboard(&app).history().iter().map(|h| h.title()).collect();
    assert_eq!(titles, vec!["second question", "first question"]);
}

#[test]
fn message_string_becomes_answer() {
    let (stub, mut app, _dir) = signed_in_app();
    stub.set_query_reply(json!({"message": "Entanglement is..."}));
    ask(&mut app, "What is entanglement?");

    let result = dashboard(&app).result().expect("result");
    assert_eq!(result.answer, "Entanglement is...");
    assert!(result.papers.is_empty());
}

#[test]
fn query_failure_shows_generic_message() {
    let (stub, mut app, _dir) = signed_in_app();
    stub.break_route("query");
    ask(&mut app, "What is entanglement?");

    let screen = dashboard(&app);
    assert_eq!(screen.error(), Some("Research processing failed"));
    assert!(!screen.is_loading());
    assert_eq!(screen.query(), "What is entanglement?");
}

#[test]
fn history_failure_yields_empty_list() {
    let (stub, mut app, _dir) = signed_in_app();
    ask(&mut app, "What is entanglement?");
    stub.break_route("history");

    app.handle_key(key(KeyCode::Tab));
    app.handle_key(char_key('r'));
    assert!(app.wait_idle(SETTLE));
    assert!(dashboard(&app).history().is_empty());
    assert_eq!(app.alert(), None);
}

#[test]
fn viewing_history_loads_result_and_esc_resets() {
    let (stub, mut app, _dir) = signed_in_app();
    stub.push_history(json!({
        "_id": "h1",
        "query": "Older question",
        "answer": {"text": "structured"},
        "summary": "Older summary",
        "createdAt": "2024-01-01T00:00:00Z",
    }));
    app.handle_key(key(KeyCode::Tab));
    app.handle_key(char_key('r'));
    assert!(app.wait_idle(SETTLE));

    app.handle_key(key(KeyCode::Enter));
    let result = dashboard(&app).result().expect("result");
    assert_eq!(result.answer, r#"{"text":"structured"}"#);
    assert_eq!(result.summary, "Older summary");

    app.handle_key(key(KeyCode::Esc));
    assert!(dashboard(&app).result().is_none());
}

#[test]
fn export_writes_report_file() {
    let (stub, mut app, dir) = signed_in_app();
    ask(&mut app, "What is entanglement?");

    app.handle_key(key(KeyCode::Tab));
    app.handle_key(char_key('e'));
    assert!(app.wait_idle(SETTLE));

    let path = dir.path().join("research-report-c1.pdf");
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(dashboard(&app).notice().is_some());
    assert_eq!(stub.calls_to("export"), vec!["export:c1"]);
}

#[test]
fn export_converts_base64_json() {
    let (stub, mut app, dir) = signed_in_app();
    stub.set_export_reply(json!({"data": "JVBERi0xLjQ="}));
    ask(&mut app, "What is entanglement?");

    app.handle_key(key(KeyCode::Tab));
    app.handle_key(char_key('e'));
    assert!(app.wait_idle(SETTLE));

    let bytes = std::fs::read(dir.path().join("research-report-c1.pdf")).unwrap();
    assert_eq!(bytes, b"%PDF-1.4");
}

#[test]
fn export_failure_raises_alert() {
    let (stub, mut app, dir) = signed_in_app();
    stub.set_export_reply(json!({"err": "Report not ready"}));
    ask(&mut app, "What is entanglement?");

    app.handle_key(key(KeyCode::Tab));
    app.handle_key(char_key('e'));
    assert!(app.wait_idle(SETTLE));

    assert_eq!(app.alert(), Some("Report not ready"));
    assert!(!dir.path().join("research-report-c1.pdf").exists());

    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.alert(), None);
    assert_eq!(app.route(), Route::Dashboard);
}

#[test]
fn sign_out_returns_to_sign_in() {
    let (_stub, mut app, _dir) = signed_in_app();
    assert!(draw(&app).contains("Sign out"));

    app.handle_key(key(KeyCode::F(4)));
    assert!(!app.session().authenticated);
    assert_eq!(app.route(), Route::Signin);

    app.handle_key(key(KeyCode::F(3)));
    assert!(matches!(app.screen(), Screen::SignInRequired));
}

#[test]
fn leaving_dashboard_discards_pending_answer() {
    let (_stub, mut app, _dir) = signed_in_app();
    type_str(&mut app, "What is entanglement?");
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::F(2)));

    assert!(app.wait_idle(SETTLE));
    assert_eq!(app.route(), Route::Signin);
    assert!(matches!(app.screen(), Screen::SignIn(_)));
}

// ---- Rendering ----

#[test]
fn every_screen_renders() {
    let (_stub, mut app, _dir) = signed_in_app();
    let text = draw(&app);
    assert!(text.contains("research"));
    assert!(text.contains("Research question"));

    let expected = [
        (Route::Register, "Username"),
        (Route::Verify, "No verification token"),
        (Route::Signin, "Password"),
        (Route::Dashboard, "History"),
    ];
    for (route, marker) in expected {
        app.navigate(route, RouteParams::default());
        let text = draw(&app);
        assert!(text.contains(marker), "{route} should show {marker:?}");
    }
}
