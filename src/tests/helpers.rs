//! Shared fixtures: a recording in-memory transport and canned gateway documents

use crate::upnp::{Gateway, HttpResponse, HttpTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

pub const LOCATION: &str = "http://192.168.1.1:5431/desc.xml";
pub const CONTROL_URL: &str = "http://192.168.1.1:5431/ctl/IPConn";
pub const WAN_IP_SERVICE: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

pub fn local_addr() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, 20)
}

pub fn gateway_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))
}

pub fn ssdp_reply(location: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age=120\r\n\
         ST: urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\
         USN: uuid:upnp-InternetGatewayDevice-1_0-001122334455::urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\
         EXT:\r\n\
         SERVER: Linux/3.4 UPnP/1.0 miniupnpd/2.3\r\n\
         LOCATION: {}\r\n\
         \r\n",
        location
    )
    .into_bytes()
}

/// Typical IGD description: the WAN connection service sits two devices deep,
/// after services that must be skipped
pub fn description_xml(control_url: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:L3Forwarding1</serviceId>
        <controlURL>/ctl/L3F</controlURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <serviceList>
          <service>
            <serviceType>urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1</serviceType>
            <controlURL>/ctl/CmnIfCfg</controlURL>
          </service>
        </serviceList>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <serviceList>
              <service>
                <serviceType>{}</serviceType>
                <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
                <controlURL>{}</controlURL>
                <eventSubURL>/evt/IPConn</eventSubURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
  </device>
</root>"#,
        WAN_IP_SERVICE, control_url
    )
}

pub fn soap_response(action: &str, fields: &[(&str, &str)]) -> String {
    let body: String = fields
        .iter()
        .map(|(name, value)| format!("<{}>{}</{}>", name, value, name))
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\r\n\
         <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
         <s:Body><u:{action}Response xmlns:u=\"{service}\">{body}</u:{action}Response>\
         </s:Body></s:Envelope>",
        action = action,
        service = WAN_IP_SERVICE,
        body = body
    )
}

pub fn soap_fault(code: &str, description: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\r\n\
         <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
         <s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring>\
         <detail><UPnPError xmlns=\"urn:schemas-upnp-org:control-1-0\">\
         <errorCode>{}</errorCode><errorDescription>{}</errorDescription>\
         </UPnPError></detail></s:Fault></s:Body></s:Envelope>",
        code, description
    )
}

/// One request seen by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory transport: GETs are served by URL, POSTs from a FIFO queue
#[derive(Default)]
pub struct MockTransport {
    gets: Mutex<HashMap<String, HttpResponse>>,
    posts: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mock already serving the standard description at [`LOCATION`]
    pub fn with_description() -> Arc<Self> {
        let mock = Self::new();
        mock.serve_get(LOCATION, 200, description_xml("ctl/IPConn"));
        mock
    }

    pub fn serve_get(&self, url: &str, status: u16, body: impl Into<String>) {
        let body: String = body.into();
        self.gets
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::new(status, body));
    }

    pub fn queue_post(&self, status: u16, body: impl Into<String>) {
        let body: String = body.into();
        self.posts
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub fn queue_post_failure(&self, message: &str) {
        self.posts
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }

    pub fn last_post(&self) -> RecordedRequest {
        self.posts().pop().expect("no POST recorded")
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            headers: Vec::new(),
            body: String::new(),
        });

        self.gets
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Connection(format!("connection refused: {}", url)))
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            body: String::from_utf8(body).expect("request body is UTF-8"),
        });

        match self.posts.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Connection(message)),
            None => Err(TransportError::Connection("no response queued".to_string())),
        }
    }
}

/// Gateway resolved against the standard description
pub fn ready_gateway(mock: &Arc<MockTransport>) -> Gateway<Arc<MockTransport>> {
    Gateway::with_transport(mock.clone(), &ssdp_reply(LOCATION), local_addr(), gateway_addr())
        .expect("Failed to resolve gateway")
}

/// Minimal HTTP/1.1 server on loopback
///
/// Accepts one connection per canned response, in order, and hands back the
/// raw request text of each.
pub fn serve_http(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("Failed to accept");
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            seen.push(read_request(&mut stream));

            let reply = format!(
                "HTTP/1.1 {} X\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        seen
    });

    (base, handle)
}

fn read_request(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).expect("Failed to read request");
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).to_string()
}
