//! Interception semantics as seen through a driver session

use std::time::Duration;

use staycheck_e2e::sim::{Faults, SimulatedHotel, CONTACT_NAME, SUBMIT_CONTACT};
use staycheck_engine::driver::DriverExt;
use staycheck_engine::{EngineError, Locator, RouteSpec, UiDriver};

const WAIT: Duration = Duration::from_millis(100);

async fn submit_empty_contact(hotel: &SimulatedHotel) {
    hotel.visit("/").await.unwrap();
    hotel.find(Locator::css(CONTACT_NAME)).type_text("Jane Doe").await.unwrap();
    hotel.find(Locator::css(SUBMIT_CONTACT)).click().await.unwrap();
}

#[tokio::test]
async fn test_call_before_registration_is_missed() {
    let hotel = SimulatedHotel::new();

    submit_empty_contact(&hotel).await;
    hotel
        .register_interception(&RouteSpec::new("POST", "/message", "postMessage"))
        .await
        .unwrap();

    let err = hotel.await_interception("postMessage", WAIT).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InterceptionTimeout { ref alias, waited_ms: 100 } if alias == "postMessage"
    ));
}

#[tokio::test]
async fn test_registered_call_is_captured_with_bodies() {
    let hotel = SimulatedHotel::new();
    hotel
        .register_interception(&RouteSpec::new("POST", "/message", "postMessage"))
        .await
        .unwrap();

    submit_empty_contact(&hotel).await;

    let call = hotel.await_interception("postMessage", WAIT).await.unwrap();
    assert_eq!(call.method, "POST");
    assert_eq!(call.status, 400);
    assert_eq!(call.request_body["name"], "Jane Doe");
    assert!(call.response_body["errors"].is_array());
}

#[tokio::test]
async fn test_each_wait_consumes_one_call() {
    let hotel = SimulatedHotel::new();
    hotel
        .register_interception(&RouteSpec::new("POST", "/message", "postMessage"))
        .await
        .unwrap();

    submit_empty_contact(&hotel).await;
    hotel.find(Locator::css(SUBMIT_CONTACT)).click().await.unwrap();

    hotel.await_interception("postMessage", WAIT).await.unwrap();
    hotel.await_interception("postMessage", WAIT).await.unwrap();
    let err = hotel.await_interception("postMessage", WAIT).await.unwrap_err();
    assert!(matches!(err, EngineError::InterceptionTimeout { .. }));
}

#[tokio::test]
async fn test_glob_route_and_unknown_alias() {
    let hotel = SimulatedHotel::with_faults(Faults {
        latency: Duration::from_millis(10),
        ..Default::default()
    });
    hotel
        .register_interception(&RouteSpec::new("POST", "/mess*", "anyPost"))
        .await
        .unwrap();

    submit_empty_contact(&hotel).await;

    let call = hotel.await_interception("anyPost", WAIT).await.unwrap();
    assert!(call.url.ends_with("/message"));

    let err = hotel.await_interception("getRooms", WAIT).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownAlias(_)));
}

#[tokio::test]
async fn test_slow_response_to_earlier_request_is_ignored() {
    let hotel = SimulatedHotel::with_faults(Faults {
        latency: Duration::from_millis(30),
        ..Default::default()
    });
    hotel.visit("/").await.unwrap();

    // Request goes out before the route exists; its response lands after
    hotel.find(Locator::css(SUBMIT_CONTACT)).click().await.unwrap();
    hotel
        .register_interception(&RouteSpec::new("POST", "/message", "postMessage"))
        .await
        .unwrap();
    hotel.find(Locator::css(CONTACT_NAME)).type_text("Jane Doe").await.unwrap();
    hotel.find(Locator::css(SUBMIT_CONTACT)).click().await.unwrap();

    let call = hotel.await_interception("postMessage", WAIT).await.unwrap();
    assert_eq!(call.request_body["name"], "Jane Doe");
    let err = hotel.await_interception("postMessage", WAIT).await.unwrap_err();
    assert!(matches!(err, EngineError::InterceptionTimeout { .. }));
}
