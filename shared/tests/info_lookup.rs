use crux_core::testing::AppTester;
use crux_http::protocol::{HttpRequest, HttpResponse};
use shared::{Dialog, DialogKind, Effect, Event, Field, ListingId, Locale, Model, Settings};

type Tester = AppTester<shared::App, Effect>;

fn configured() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(
        Event::Configure(Settings::default().with_api_key("sk-test")),
        &mut model,
    );
    (app, model)
}

fn publish(app: &Tester, model: &mut Model, values: [&str; 5]) -> ListingId {
    app.update(Event::ComposerOpened, model);
    for (field, value) in Field::ALL.into_iter().zip(values) {
        app.update(
            Event::FieldChanged {
                field,
                value: value.to_string(),
            },
            model,
        );
    }
    app.update(Event::ComposerSubmitted, model);
    app.update(Event::DialogAcknowledged, model);
    model.listings.iter().last().unwrap().id.clone()
}

fn corolla(app: &Tester, model: &mut Model) -> ListingId {
    publish(app, model, ["Toyota", "Corolla", "2020", "30000", "80000"])
}

fn completion(text: &str) -> HttpResponse {
    HttpResponse::ok()
        .json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        }))
        .build()
}

fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Sends `MoreInfoRequested` and returns the pending HTTP request.
fn request_info(
    app: &Tester,
    model: &mut Model,
    listing_id: &ListingId,
) -> crux_core::Request<HttpRequest> {
    let update = app.update(
        Event::MoreInfoRequested {
            listing_id: listing_id.clone(),
        },
        model,
    );
    update
        .effects
        .into_iter()
        .find_map(|effect| match effect {
            Effect::Http(request) => Some(request),
            Effect::Render(_) => None,
        })
        .expect("lookup should emit an http effect")
}

fn resolve(
    app: &Tester,
    model: &mut Model,
    request: &mut crux_core::Request<HttpRequest>,
    response: HttpResponse,
) {
    let update = app.resolve(request, crux_http::protocol::HttpResult::Ok(response)).expect("request resolves");
    for event in update.events {
        app.update(event, model);
    }
}

#[test]
fn test_lookup_request_shape() {
    let (app, mut model) = configured();
    let id = corolla(&app, &mut model);

    let request = request_info(&app, &mut model, &id);
    let http = &request.operation;

    assert_eq!(http.method, "POST");
    assert_eq!(http.url, "https://api.openai.com/v1/chat/completions");
    assert_eq!(header(http, "Authorization"), Some("Bearer sk-test"));
    assert_eq!(header(http, "Content-Type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_slice(&http.body).unwrap();
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["temperature"].as_f64(), Some(0.7));
    assert_eq!(body["max_tokens"].as_u64(), Some(150));
    assert_eq!(body["top_p"].as_f64(), Some(1.0));
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Toyota Corolla 2020"));

    assert_eq!(model.pending_lookups.len(), 1);
    let view = app.view(&model);
    assert!(view.listings[0].lookup_pending);
    assert_eq!(view.lookups_in_flight, 1);
}

#[test]
fn test_lookup_success_shows_text() {
    let (app, mut model) = configured();
    let id = corolla(&app, &mut model);
    let before = model.listings.iter().next().cloned();

    let mut request = request_info(&app, &mut model, &id);
    resolve(&app, &mut model, &mut request, (completion("text A")));

    assert_eq!(
        model.front_dialog(),
        Some(&Dialog::ListingInfo {
            listing_id: id,
            text: "text A".into()
        })
    );
    assert!(model.pending_lookups.is_empty());
    assert_eq!(model.listings.iter().next().cloned(), before);

    let dialog = app.view(&model).dialog.unwrap();
    assert_eq!(dialog.kind, DialogKind::Info);
    assert_eq!(dialog.title, "Vehicle details");
    assert_eq!(dialog.message, "text A");
}

#[test]
fn test_lookup_failure_shows_generic_error() {
    let (app, mut model) = configured();
    app.update(
        Event::Configure(Settings::default().with_locale(Locale::BrazilianPortuguese)),
        &mut model,
    );
    let id = corolla(&app, &mut model);

    let mut request = request_info(&app, &mut model, &id);
    let rejected = HttpResponse::status(401)
        .body(br#"{"error":{"message":"Incorrect API key provided"}}"#.to_vec())
        .build();
    resolve(&app, &mut model, &mut request, rejected);

    let dialog = app.view(&model).dialog.unwrap();
    assert_eq!(dialog.kind, DialogKind::Error);
    assert_eq!(dialog.title, "Erro");
    assert_eq!(
        dialog.message,
        "Erro ao obter informações do veículo. Por favor, tente novamente mais tarde."
    );
    assert_eq!(model.listings.len(), 1);
}

#[test]
fn test_server_error_and_empty_choices() {
    let (app, mut model) = configured();
    let id = corolla(&app, &mut model);

    let mut request = request_info(&app, &mut model, &id);
    let unavailable = HttpResponse::status(503).body(b"upstream down".to_vec()).build();
    resolve(&app, &mut model, &mut request, unavailable);

    let mut request = request_info(&app, &mut model, &id);
    let empty = HttpResponse::ok().json(serde_json::json!({ "choices": [] })).build();
    resolve(&app, &mut model, &mut request, empty);

    let failures: Vec<_> = model.dialogs.iter().cloned().collect();
    assert_eq!(
        failures,
        [
            Dialog::LookupFailed {
                listing_id: id.clone()
            },
            Dialog::LookupFailed { listing_id: id }
        ]
    );
}

#[test]
fn test_non_200_success_status_is_a_failure() {
    let (app, mut model) = configured();
    let id = corolla(&app, &mut model);

    let mut request = request_info(&app, &mut model, &id);
    let created = HttpResponse::status(201)
        .json(serde_json::json!({
            "choices": [{ "message": { "content": "text A" } }]
        }))
        .build();
    resolve(&app, &mut model, &mut request, created);

    assert_eq!(
        model.front_dialog(),
        Some(&Dialog::LookupFailed { listing_id: id })
    );
    assert!(model.pending_lookups.is_empty());
}

#[test]
fn test_dismissed_screen_discards_late_response() {
    let (app, mut model) = configured();
    let id = corolla(&app, &mut model);

    let mut request = request_info(&app, &mut model, &id);
    app.update(Event::ScreenDismissed, &mut model);
    assert!(model.pending_lookups.is_empty());

    resolve(&app, &mut model, &mut request, (completion("too late")));
    assert!(model.dialogs.is_empty());
    assert!(app.view(&model).dialog.is_none());
}

#[test]
fn test_concurrent_lookups_resolve_independently() {
    let (app, mut model) = configured();
    let corolla_id = corolla(&app, &mut model);
    let civic_id = publish(&app, &mut model, ["Honda", "Civic", "2018", "45000", "65000"]);

    let mut first = request_info(&app, &mut model, &corolla_id);
    let mut second = request_info(&app, &mut model, &civic_id);
    let mut repeat = request_info(&app, &mut model, &corolla_id);
    assert_eq!(model.pending_lookups.len(), 3);

    // Responses arrive out of order.
    resolve(&app, &mut model, &mut second, (completion("civic text")));
    resolve(&app, &mut model, &mut repeat, (completion("corolla again")));
    resolve(&app, &mut model, &mut first, (completion("corolla text")));

    assert!(model.pending_lookups.is_empty());
    let dialogs: Vec<_> = model.dialogs.iter().cloned().collect();
    assert_eq!(
        dialogs,
        [
            Dialog::ListingInfo {
                listing_id: civic_id,
                text: "civic text".into()
            },
            Dialog::ListingInfo {
                listing_id: corolla_id.clone(),
                text: "corolla again".into()
            },
            Dialog::ListingInfo {
                listing_id: corolla_id,
                text: "corolla text".into()
            },
        ]
    );

    // FIFO acknowledgement.
    assert_eq!(app.view(&model).dialog.unwrap().message, "civic text");
    app.update(Event::DialogAcknowledged, &mut model);
    assert_eq!(app.view(&model).dialog.unwrap().message, "corolla again");
    app.update(Event::DialogAcknowledged, &mut model);
    assert_eq!(app.view(&model).queued_dialogs, 1);
}

#[test]
fn test_missing_api_key_emits_no_request() {
    let app = Tester::default();
    let mut model = Model::default();
    let id = corolla(&app, &mut model);

    let update = app.update(Event::MoreInfoRequested { listing_id: id }, &mut model);

    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
    assert_eq!(model.front_dialog(), Some(&Dialog::LookupUnavailable));
    assert!(!app.view(&model).lookups_available);
}

#[test]
fn test_unknown_listing_is_ignored() {
    let (app, mut model) = configured();
    let update = app.update(
        Event::MoreInfoRequested {
            listing_id: ListingId::new("nope"),
        },
        &mut model,
    );

    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
    assert!(model.dialogs.is_empty());
    assert!(model.pending_lookups.is_empty());
}

#[test]
fn test_custom_endpoint_and_model() {
    let app = Tester::default();
    let mut model = Model::default();
    let mut settings = Settings::default()
        .with_api_key("sk-test")
        .with_endpoint("https://llm.example.com/v1/chat/completions");
    settings.model = Some("gpt-4o-mini".into());
    app.update(Event::Configure(settings), &mut model);

    let id = corolla(&app, &mut model);
    let request = request_info(&app, &mut model, &id);

    assert_eq!(
        request.operation.url,
        "https://llm.example.com/v1/chat/completions"
    );
    let body: serde_json::Value = serde_json::from_slice(&request.operation.body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
}

#[test]
fn test_insecure_endpoint_is_rejected() {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(
        Event::Configure(
            Settings::default()
                .with_api_key("sk-test")
                .with_endpoint("http://llm.example.com/v1/chat/completions"),
        ),
        &mut model,
    );

    assert!(!model.lookup.is_ready());
    assert_eq!(
        model.lookup.endpoint(),
        "https://api.openai.com/v1/chat/completions"
    );
}
