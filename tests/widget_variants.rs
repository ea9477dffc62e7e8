use deskboard::dashboard::node::Element;
use deskboard::dashboard::widgets::{FALLBACK_RATES, LOCAL_QUOTES, QUOTE_FALLBACK};
use deskboard::dashboard::{Dashboard, WidgetConfig, WidgetContext, WidgetEvent, WidgetRegistry};
use deskboard::sources::{CurrentConditions, RateTable, RemoteQuote, Sources};
use deskboard::storage::{MemoryStore, StateStore, STATE_KEY};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::time::{Duration, Instant};

fn open(ctx: WidgetContext) -> Dashboard {
    Dashboard::open(
        Box::new(MemoryStore::new()),
        WidgetRegistry::with_defaults(),
        ctx,
    )
}

/// Poll until no widget has a fetch in flight.
fn settle(dash: &mut Dashboard) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        dash.poll();
        if !dash.is_busy() {
            return;
        }
        assert!(Instant::now() < deadline, "fetch never completed");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn refresh_button(dash: &Dashboard, id: &str) -> Element {
    dash.widget(id)
        .unwrap()
        .node()
        .unwrap()
        .buttons()
        .next()
        .cloned()
        .unwrap()
}

#[test]
fn quote_rotation_returns_to_start_after_full_cycle() {
    let mut dash = open(WidgetContext::offline());
    let id = dash
        .add_widget("quote", WidgetConfig::default().with_data(json!({"index": 4})))
        .unwrap();
    for _ in 0..LOCAL_QUOTES.len() {
        dash.dispatch(&id, WidgetEvent::Refresh);
    }
    let data = dash.widget(&id).unwrap().data();
    assert_eq!(data["index"], json!(4));
    assert_eq!(data["author"], json!(LOCAL_QUOTES[4].author));
}

#[test]
fn remote_quote_failure_shows_fallback_and_reenables_button() {
    let failing = || -> anyhow::Result<RemoteQuote> { anyhow::bail!("offline") };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_quotes(failing));
    let mut dash = open(ctx);
    let id = dash
        .add_widget("quote", WidgetConfig::default().with_data(json!({"mode": "remote"})))
        .unwrap();
    settle(&mut dash);
    let data = dash.widget(&id).unwrap().data();
    assert_eq!(data["text"], json!(QUOTE_FALLBACK));
    assert_eq!(data["author"], json!(""));
    assert!(matches!(refresh_button(&dash, &id), Element::Button { enabled: true, ref label, .. } if label == "Refresh"));
}

#[test]
fn currency_source_failure_yields_exactly_the_fallback_codes() {
    let failing = |_base: &str| -> anyhow::Result<RateTable> { anyhow::bail!("503") };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_rates(failing));
    let mut dash = open(ctx);
    let id = dash.add_widget("currency", WidgetConfig::default()).unwrap();
    settle(&mut dash);
    let rates = dash.widget(&id).unwrap().data()["rates"].clone();
    let expected: serde_json::Map<String, serde_json::Value> = FALLBACK_RATES
        .iter()
        .map(|(code, rate)| (code.to_string(), json!(rate)))
        .collect();
    assert_eq!(rates, serde_json::Value::Object(expected));
}

#[test]
fn currency_rates_are_inverted_against_base() {
    let source = |base: &str| -> anyhow::Result<RateTable> {
        assert_eq!(base, "RUB");
        Ok(RateTable::from([
            ("USD".to_string(), 0.01),
            ("EUR".to_string(), 0.008),
            ("GBP".to_string(), 0.0125),
        ]))
    };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_rates(source));
    let mut dash = open(ctx);
    let id = dash.add_widget("currency", WidgetConfig::default()).unwrap();
    settle(&mut dash);
    let data = dash.widget(&id).unwrap().data();
    assert_eq!(data["rates"], json!({"USD": "100.00", "EUR": "125.00", "GBP": "80.00"}));
    let node = dash.widget(&id).unwrap().node().unwrap();
    assert!(node.body_text().contains("USD/RUB: 100.00"));
}

#[test]
fn restored_remote_rates_are_refetched_on_startup() {
    let mut store = MemoryStore::new();
    let saved = json!([{
        "type": "currency",
        "id": "c",
        "title": "Rates",
        "data": {"mode": "remote", "rates": {"USD": "1.00", "EUR": "1.00", "GBP": "1.00"}}
    }]);
    store.set(STATE_KEY, &saved.to_string()).unwrap();
    let source = |_base: &str| -> anyhow::Result<RateTable> {
        Ok(RateTable::from([
            ("USD".to_string(), 0.01),
            ("EUR".to_string(), 0.01),
            ("GBP".to_string(), 0.01),
        ]))
    };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_rates(source));
    let mut dash = Dashboard::open(Box::new(store.clone()), WidgetRegistry::with_defaults(), ctx);

    assert!(dash.is_busy());
    let node = dash.widget("c").unwrap().node().unwrap();
    assert!(node.body_text().contains("USD/RUB: 1.00"));

    settle(&mut dash);
    let data = dash.widget("c").unwrap().data();
    assert_eq!(data["rates"], json!({"USD": "100.00", "EUR": "100.00", "GBP": "100.00"}));
}

#[test]
fn restored_remote_quote_is_refetched_on_startup() {
    let mut store = MemoryStore::new();
    let saved = json!([{
        "type": "quote",
        "id": "q",
        "title": "Quote",
        "data": {"mode": "remote", "text": "yesterday", "author": "someone"}
    }]);
    store.set(STATE_KEY, &saved.to_string()).unwrap();
    let source = || -> anyhow::Result<RemoteQuote> {
        Ok(RemoteQuote {
            content: "today".into(),
            author: "someone else".into(),
        })
    };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_quotes(source));
    let mut dash = Dashboard::open(Box::new(store.clone()), WidgetRegistry::with_defaults(), ctx);
    assert!(dash.is_busy());
    settle(&mut dash);
    let data = dash.widget("q").unwrap().data();
    assert_eq!(data["text"], json!("today"));
    assert_eq!(data["author"], json!("someone else"));
}

#[test]
fn city_search_supersedes_the_fetch_in_flight() {
    let source = |city: &str| -> anyhow::Result<CurrentConditions> {
        if city == "Moscow" {
            std::thread::sleep(Duration::from_millis(200));
            anyhow::bail!("slow and broken");
        }
        Ok(CurrentConditions {
            temperature: 12.0,
            apparent_temperature: 10.5,
            humidity: 55.0,
            wind_speed: 4.0,
            weather_code: 0,
        })
    };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_weather(source));
    let mut dash = open(ctx);
    let id = dash.add_widget("weather", WidgetConfig::default()).unwrap();
    assert!(dash.is_busy());

    dash.dispatch(&id, WidgetEvent::SearchCity("Riga".into()));
    settle(&mut dash);
    std::thread::sleep(Duration::from_millis(300));
    dash.poll();

    let data = dash.widget(&id).unwrap().data();
    assert_eq!(data["city"], json!("Riga"));
    assert_eq!(data["weatherData"]["condition"], json!("Clear sky"));
}

#[test]
fn weather_fetch_runs_for_searched_city() {
    let source = |city: &str| -> anyhow::Result<CurrentConditions> {
        if city != "Oslo" {
            anyhow::bail!("unknown city {city}");
        }
        Ok(CurrentConditions {
            temperature: -3.2,
            apparent_temperature: -7.9,
            humidity: 80.0,
            wind_speed: 5.0,
            weather_code: 3,
        })
    };
    let ctx = WidgetContext::offline().with_sources(Sources::offline().with_weather(source));
    let mut dash = open(ctx);
    let id = dash.add_widget("weather", WidgetConfig::default()).unwrap();
    settle(&mut dash);
    let info = dash.widget(&id).unwrap().node().unwrap().region("info").cloned().unwrap();
    assert!(info.elements.iter().any(|e| matches!(e, Element::Error(_))));

    dash.dispatch(&id, WidgetEvent::SearchCity("  Oslo ".into()));
    settle(&mut dash);
    let data = dash.widget(&id).unwrap().data();
    assert_eq!(data["city"], json!("Oslo"));
    assert_eq!(data["weatherData"]["condition"], json!("Overcast"));
    assert_eq!(data["weatherData"]["feelsLike"], json!(-7.9));
}

#[test]
fn notes_never_become_empty() {
    let mut dash = open(WidgetContext::offline());
    let id = dash.add_widget("notes", WidgetConfig::default()).unwrap();
    dash.dispatch(&id, WidgetEvent::DeleteNote(0));
    assert_eq!(dash.widget(&id).unwrap().data(), json!({"notes": [""]}));

    dash.dispatch(&id, WidgetEvent::AddNote);
    dash.dispatch(&id, WidgetEvent::EditNotes(vec!["one".into(), "two".into()]));
    dash.dispatch(&id, WidgetEvent::DeleteNote(0));
    assert_eq!(dash.widget(&id).unwrap().data(), json!({"notes": ["two"]}));
}

#[test]
fn todo_stats_follow_every_change() {
    let mut dash = open(WidgetContext::offline());
    let id = dash.add_widget("todo", WidgetConfig::default()).unwrap();
    dash.dispatch(&id, WidgetEvent::AddTask("a".into()));
    dash.dispatch(&id, WidgetEvent::AddTask("   ".into()));
    dash.dispatch(&id, WidgetEvent::AddTask("b".into()));
    let first = dash.widget(&id).unwrap().data()["tasks"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    dash.dispatch(&id, WidgetEvent::ToggleTask(first));

    let stats = dash.widget(&id).unwrap().node().unwrap().region("stats").cloned().unwrap();
    assert_eq!(stats.elements, vec![Element::text("Total: 2 | Completed: 1")]);
}

fn task_ids(dash: &Dashboard, id: &str) -> Vec<String> {
    dash.widget(id).unwrap().data()["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn todo_stats_hold_over_random_edits() {
    let mut rng = rand::thread_rng();
    let mut dash = open(WidgetContext::offline());
    let id = dash.add_widget("todo", WidgetConfig::default()).unwrap();

    for step in 0..300 {
        let ids = task_ids(&dash, &id);
        let event = match (rng.gen_range(0..3), ids.choose(&mut rng)) {
            (1, Some(task)) => WidgetEvent::ToggleTask(task.clone()),
            (2, Some(task)) => WidgetEvent::DeleteTask(task.clone()),
            _ => WidgetEvent::AddTask(format!("task {step}")),
        };
        dash.dispatch(&id, event);

        let tasks = dash.widget(&id).unwrap().data()["tasks"].clone();
        let tasks = tasks.as_array().unwrap();
        let done = tasks.iter().filter(|t| t["completed"] == json!(true)).count();
        let stats = dash.widget(&id).unwrap().node().unwrap().region("stats").cloned().unwrap();
        assert_eq!(
            stats.elements,
            vec![Element::text(format!("Total: {} | Completed: {}", tasks.len(), done))],
            "after step {step}"
        );
    }
}

#[test]
fn minimize_hides_body_but_keeps_header() {
    let mut dash = open(WidgetContext::offline());
    let id = dash.add_widget("notes", WidgetConfig::default()).unwrap();
    dash.dispatch(&id, WidgetEvent::Minimize);
    let node = dash.widget(&id).unwrap().node().unwrap();
    assert!(!node.body.visible);
    assert_eq!(node.header.title, "Notes");
    dash.dispatch(&id, WidgetEvent::Minimize);
    assert!(dash.widget(&id).unwrap().node().unwrap().body.visible);
}
