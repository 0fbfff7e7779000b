#![allow(clippy::unwrap_used, dead_code)]
// Loopback fake devices speaking the wire protocol.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

use plugwire_api::cipher::{self, DEFAULT_KEY};

pub type Handler = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// A TCP device that answers each request with `handler(request)`;
/// `None` means stay silent.
pub struct FakeTcpDevice {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeTcpDevice {
    pub async fn spawn(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut header = [0u8; 4];
                    if stream.read_exact(&mut header).await.is_err() {
                        return;
                    }
                    let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
                    stream.read_exact(&mut body).await.unwrap();
                    let request: Value =
                        serde_json::from_slice(&cipher::decode(&body, DEFAULT_KEY)).unwrap();
                    log.lock().unwrap().push(request.clone());

                    match handler(&request) {
                        Some(reply) => {
                            let framed =
                                cipher::encode_framed(reply.to_string().as_bytes(), DEFAULT_KEY)
                                    .unwrap();
                            stream.write_all(&framed).await.unwrap();
                        }
                        None => tokio::time::sleep(std::time::Duration::from_secs(5)).await,
                    }
                });
            }
        });

        Self { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn plug_sysinfo(id: &str, relay: u8) -> Value {
    json!({
        "err_code": 0,
        "deviceId": id,
        "alias": "Living Room",
        "model": "HS110(EU)",
        "sw_ver": "1.5.4",
        "hw_ver": "2.0",
        "type": "IOT.SMARTPLUGSWITCH",
        "mac": "50:C7:BF:01:02:03",
        "feature": "TIM:ENE",
        "relay_state": relay
    })
}

pub fn strip_sysinfo(id: &str) -> Value {
    json!({
        "err_code": 0,
        "deviceId": id,
        "alias": "Power Strip",
        "model": "HS300(US)",
        "sw_ver": "1.0.6",
        "hw_ver": "1.0",
        "mic_type": "IOT.SMARTPLUGSWITCH",
        "mac": "50:C7:BF:0A:0B:0C",
        "feature": "TIM:ENE",
        "children": [
            { "id": format!("{id}00"), "state": 0, "alias": "Lamp" },
            { "id": format!("{id}01"), "state": 1, "alias": "Fan" }
        ]
    })
}

pub fn bulb_sysinfo(id: &str) -> Value {
    json!({
        "err_code": 0,
        "deviceId": id,
        "alias": "Hallway",
        "model": "LB130(US)",
        "sw_ver": "1.8.6",
        "hw_ver": "1.0",
        "mic_type": "IOT.SMARTBULB",
        "mic_mac": "50C7BF112233",
        "is_dimmable": 1,
        "is_color": 1,
        "light_state": { "on_off": 0, "dft_on_state": { "brightness": 100 } }
    })
}

/// Standard plug behavior: answer sysinfo, relay, and emeter requests.
pub fn plug_handler(id: &'static str) -> Handler {
    let relay = Arc::new(Mutex::new(0u8));
    Arc::new(move |request: &Value| {
        let mut reply = serde_json::Map::new();
        let system = &request["system"];
        let mut system_reply = serde_json::Map::new();
        if system.get("get_sysinfo").is_some() {
            let state = *relay.lock().unwrap();
            system_reply.insert("get_sysinfo".into(), plug_sysinfo(id, state));
        }
        if let Some(set) = system.get("set_relay_state") {
            *relay.lock().unwrap() = u8::try_from(set["state"].as_u64().unwrap()).unwrap();
            system_reply.insert("set_relay_state".into(), json!({ "err_code": 0 }));
        }
        if let Some(set) = system.get("set_dev_alias") {
            assert!(set["alias"].is_string());
            system_reply.insert("set_dev_alias".into(), json!({ "err_code": 0 }));
        }
        if system.get("reboot").is_some() {
            system_reply.insert("reboot".into(), json!({ "err_code": -2, "err_msg": "member not support" }));
        }
        if !system_reply.is_empty() {
            reply.insert("system".into(), Value::Object(system_reply));
        }
        if request["emeter"].get("get_realtime").is_some() {
            reply.insert(
                "emeter".into(),
                json!({ "get_realtime": { "err_code": 0, "power_mw": 15000, "voltage_mv": 230_000 } }),
            );
        }
        Some(Value::Object(reply))
    })
}

/// A UDP device that answers probes from `sysinfo()`, while `online`.
pub struct FakeUdpDevice {
    pub addr: SocketAddr,
    pub online: Arc<std::sync::atomic::AtomicBool>,
}

impl FakeUdpDevice {
    pub async fn spawn(replies: Vec<Vec<u8>>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let online = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = Arc::clone(&online);

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let probe: Value =
                    serde_json::from_slice(&cipher::decode(&buf[..len], DEFAULT_KEY)).unwrap();
                assert!(probe["system"]["get_sysinfo"].is_object());
                if !flag.load(std::sync::atomic::Ordering::SeqCst) {
                    continue;
                }
                for reply in &replies {
                    socket
                        .send_to(&cipher::encode(reply, DEFAULT_KEY), from)
                        .await
                        .unwrap();
                }
            }
        });

        Self { addr, online }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, std::sync::atomic::Ordering::SeqCst);
    }
}

pub fn probe_reply(sysinfo: Value) -> Vec<u8> {
    json!({
        "system": { "get_sysinfo": sysinfo },
        "emeter": { "get_realtime": { "err_code": 0, "power": 3.5 } },
        "smartlife.iot.common.emeter": { "err_code": -1, "err_msg": "module not support" }
    })
    .to_string()
    .into_bytes()
}
