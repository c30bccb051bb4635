use oas_contract::{ContractCheckerBuilder, ContractError};
use serde_json::json;

fn main() -> Result<(), ContractError> {
    let document = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/petstore-swagger.json"
    );
    let checker = ContractCheckerBuilder::new()
        .load_from_file(document)
        .build()?;

    let request = http::Request::builder()
        .method("POST")
        .uri("/api/pets")
        .header("X-Required-Header", "demo")
        .header("Content-Type", "application/json")
        .body(json!({"tag": "dog"}).to_string())
        .unwrap_or_default();

    let rejected = http::Response::builder()
        .status(400)
        .header("Content-Type", "application/json")
        .body(json!({"code": 400, "message": "name is required"}).to_string())
        .unwrap_or_default();

    let accepted = http::Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(json!({"id": 1, "name": "rex"}).to_string())
        .unwrap_or_default();

    match checker.check_request(&request) {
        Ok(()) => println!("request matches the contract"),
        Err(err) => println!("request breaks the contract: {}", err),
    }

    // The server rejected the request, so only the response is held to the contract.
    match checker.check_request_and_response(&request, &rejected) {
        Ok(()) => println!("400 exchange matches the contract"),
        Err(err) => println!("400 exchange breaks the contract: {}", err),
    }

    match checker.check_request_and_response(&request, &accepted) {
        Ok(()) => println!("200 exchange matches the contract"),
        Err(err) => println!("200 exchange breaks the contract: {}", err),
    }
    Ok(())
}
