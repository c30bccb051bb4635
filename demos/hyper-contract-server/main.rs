use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oas_contract::converter::hyper::collect_request;
use oas_contract::{ContractChecker, ContractCheckerBuilder, HttpFact};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;

fn text_response(status: StatusCode, text: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(text)));
    *response.status_mut() = status;
    response
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    let listener = TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    let document = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/petstore-openapi3.json"
    );
    let checker = Arc::new(ContractCheckerBuilder::new().load_from_file(document).build()?);
    let contract_service = ContractService { checker };
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let contract_service_clone = contract_service.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, contract_service_clone)
                .await
            {
                println!("Error serving connection: {:?}", err);
            }
        });
    }
}

/// Rejects requests that break the contract and checks every response it
/// sends before returning it.
#[derive(Clone)]
pub struct ContractService {
    pub checker: Arc<ContractChecker>,
}

impl ContractService {
    fn answer(request: &Request<Bytes>) -> Response<Bytes> {
        let pet = json!({"id": 1, "name": "rex", "tag": "dog"});
        let body = match request.method().as_str() {
            "GET" if request.uri().path().ends_with("/pets") => json!([pet]),
            _ => pet,
        };
        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Bytes::from(body.to_string()))
            .unwrap_or_default()
    }
}

impl Service<Request<Incoming>> for ContractService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let contract_service = self.clone();
        Box::pin(async move {
            let request = match collect_request(req).await {
                Ok(request) => request,
                Err(err) => return Ok(text_response(StatusCode::BAD_REQUEST, err.to_string())),
            };

            if let Err(err) = contract_service.checker.check_request(&request) {
                return Ok(text_response(StatusCode::BAD_REQUEST, err.to_string()));
            }

            let response = Self::answer(&request);
            if let Err(err) = contract_service.checker.check_response(
                &response,
                request.path_str(),
                request.method_str(),
            ) {
                return Ok(text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err.to_string(),
                ));
            }
            Ok(response.map(Full::new))
        })
    }
}
