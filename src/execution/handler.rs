use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, info};
use tiny_http::{Header, Request, Response, Server};
use crate::Result;
use crate::clock::Clock;
use crate::execution::PendingTally;
use crate::window::SharedWindow;

/// Answers the counter route: counts the request into the tally and reports the
/// window total as of the last flush. The request being served shows up after
/// the next tick.
#[derive(Debug)]
pub struct CounterHandler {
    tally: Arc<PendingTally>,
    window: Arc<SharedWindow>,
    clock: Arc<dyn Clock>,
    route: String,
    debug: bool,
}

impl CounterHandler {
    pub fn new(tally: Arc<PendingTally>, window: Arc<SharedWindow>, clock: Arc<dyn Clock>, route: String, debug: bool) -> Self {
        Self { tally, window, clock, route, debug }
    }

    pub fn count_request(&self) -> String {
        self.tally.increment();
        self.body()
    }

    pub fn body(&self) -> String {
        let total = self.window.total(self.clock.now());
        let mut body = format!("There has been {} requests in the last {} seconds.", total, self.window.window_seconds());
        if self.debug {
            body.push_str("\nBuffer: ");
            body.push_str(&self.window.describe());
        }
        body
    }

    fn matches_route(&self, url: &str) -> bool {
        let path = url.split('?').next().unwrap_or(url);
        path == self.route
    }

    pub fn handle_request(&self, request: Request) {
        let (status, body) = if self.matches_route(request.url()) {
            (200, self.count_request())
        } else {
            (404, "Not Found".to_string())
        };
        debug!("{} {} -> {}", request.method(), request.url(), status);
        let mut response = Response::from_string(body).with_status_code(status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..]) {
            response.add_header(header);
        }
        if let Err(e) = request.respond(response) {
            debug!("failed to write response: {}", e);
        }
    }
}

/// Go-style `:8080` means every interface.
pub fn normalize_listen(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}

pub fn bind(listen: &str) -> Result<Server> {
    let addr = normalize_listen(listen);
    Server::http(&addr).map_err(|e| format!("failed to listen on {}: {}", addr, e))
}

pub fn start_web(server: Arc<Server>, handler: Arc<CounterHandler>, workers: usize, terminated: Arc<AtomicBool>) -> Result<Vec<JoinHandle<()>>> {
    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
    for i in 0..workers {
        let server = Arc::clone(&server);
        let handler = Arc::clone(&handler);
        let terminated = Arc::clone(&terminated);
        let builder = thread::Builder::new().stack_size(1024 * 256).name(format!("web-{}", i));
        let handle = builder.spawn(move || {
            while !terminated.load(Ordering::Acquire) {
                match server.recv_timeout(Duration::from_millis(100)) {
                    Ok(Some(request)) => handler.handle_request(request),
                    Ok(None) => continue,
                    Err(e) => debug!("web-{} receive error: {}", i, e),
                }
            }
            info!("web thread {} exiting", i);
        }).map_err(|e| format!("failed to spawn web thread: {}", e))?;
        handles.push(handle);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::execution::Flusher;
    use crate::window::StoreStrategy;

    const T: u64 = 1_495_048_810;

    fn setup(strategy: StoreStrategy, debug: bool) -> (Arc<ManualClock>, CounterHandler, Flusher) {
        let clock = Arc::new(ManualClock::new(T));
        let tally = Arc::new(PendingTally::new());
        let window = Arc::new(SharedWindow::new(strategy.new_store(60)));
        let handler = CounterHandler::new(tally.clone(), window.clone(), clock.clone(), "/counter".to_string(), debug);
        (clock.clone(), handler, Flusher::new(tally, window, clock))
    }

    fn do_requests(handler: &CounterHandler, n: usize) {
        for _ in 0..n {
            handler.count_request();
        }
    }

    #[test]
    fn test_61_requests_then_one_after_a_minute() {
        for strategy in [StoreStrategy::FixedRing, StoreStrategy::SparseMap] {
            let (clock, handler, flusher) = setup(strategy, false);
            do_requests(&handler, 61);
            flusher.tick();
            assert_eq!(handler.count_request(), "There has been 61 requests in the last 60 seconds.");
            flusher.tick();

            clock.advance(61);
            handler.count_request();
            flusher.tick();
            assert_eq!(handler.body(), "There has been 1 requests in the last 60 seconds.");
        }
    }

    #[test]
    fn test_old_requests_excluded_one_minute_later() {
        for strategy in [StoreStrategy::FixedRing, StoreStrategy::SparseMap] {
            let (clock, handler, flusher) = setup(strategy, false);
            // 30 requests at 19:20:10
            do_requests(&handler, 30);
            flusher.tick();
            // 20 requests at 19:21:11
            clock.set(T + 61);
            do_requests(&handler, 20);
            flusher.tick();
            assert_eq!(handler.count_request(), "There has been 20 requests in the last 60 seconds.");
            flusher.tick();
            assert_eq!(handler.body(), "There has been 21 requests in the last 60 seconds.");
        }
    }

    #[test]
    fn test_response_lags_until_flush() {
        let (_clock, handler, flusher) = setup(StoreStrategy::FixedRing, false);
        assert_eq!(handler.count_request(), "There has been 0 requests in the last 60 seconds.");
        assert_eq!(handler.count_request(), "There has been 0 requests in the last 60 seconds.");
        flusher.tick();
        assert_eq!(handler.body(), "There has been 2 requests in the last 60 seconds.");
    }

    #[test]
    fn test_debug_body_includes_buffer() {
        let (_clock, handler, flusher) = setup(StoreStrategy::SparseMap, true);
        do_requests(&handler, 3);
        flusher.tick();
        assert_eq!(handler.body(), format!("There has been 3 requests in the last 60 seconds.\nBuffer: {{10:3@{}}}", T));
    }

    #[test]
    fn test_route_matching() {
        let (_clock, handler, _flusher) = setup(StoreStrategy::FixedRing, false);
        assert!(handler.matches_route("/counter"));
        assert!(handler.matches_route("/counter?x=1"));
        assert!(!handler.matches_route("/counter/"));
        assert!(!handler.matches_route("/metrics"));
    }

    #[test]
    fn test_normalize_listen() {
        assert_eq!(normalize_listen(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_listen("127.0.0.1:9000"), "127.0.0.1:9000");
    }

    #[test]
    fn test_http_round_trip() {
        let (_clock, handler, flusher) = setup(StoreStrategy::FixedRing, false);
        let server = Arc::new(bind("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let terminated = Arc::new(AtomicBool::new(false));
        let handles = start_web(server, Arc::new(handler), 2, terminated.clone()).unwrap();

        let url = format!("http://{}/counter", addr);
        for _ in 0..4 {
            let response = reqwest::blocking::get(&url).unwrap();
            assert_eq!(response.status().as_u16(), 200);
        }
        flusher.tick();
        let response = reqwest::blocking::get(&url).unwrap();
        assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(response.text().unwrap(), "There has been 4 requests in the last 60 seconds.");

        let missing = reqwest::blocking::get(format!("http://{}/other", addr)).unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        terminated.store(true, Ordering::Release);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
