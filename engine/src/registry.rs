//! Service registry — static table of every map endpoint we can probe.
//!
//! Each entry names one vendor/product surface and knows how to embed a
//! key into a ready-to-send probe URL. The query parameters (demo
//! coordinates, search keywords, platform and SDK tokens) are the ones the
//! vendors' own SDKs send, so a key restricted to a given surface is
//! exercised the way that surface would use it.

use std::borrow::Cow;

// ── Origins ─────────────────────────────────────────────────────────

pub const AMAP_ORIGIN: &str = "https://restapi.amap.com";
pub const BAIDU_ORIGIN: &str = "https://api.map.baidu.com";
pub const TENCENT_ORIGIN: &str = "https://apis.map.qq.com";

// ── Service Definition ──────────────────────────────────────────────

/// One probe-able service: identifier, label and URL template.
#[derive(Clone)]
pub struct ServiceDefinition {
    /// Stable identifier used by callers (e.g., "amap-webapi")
    pub id: Cow<'static, str>,
    /// Human-readable label shown to users
    pub display_name: Cow<'static, str>,
    /// Scheme + host the probe is sent to
    pub origin: Cow<'static, str>,
    /// Builds path and query with the key embedded
    pub path_builder: fn(&str) -> String,
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl ServiceDefinition {
    /// Build the full probe URL for `api_key`.
    ///
    /// The key is inserted verbatim, without percent-encoding.
    pub fn probe_url(&self, api_key: &str) -> String {
        format!("{}{}", self.origin, (self.path_builder)(api_key))
    }
}

const fn service(
    id: &'static str,
    display_name: &'static str,
    origin: &'static str,
    path_builder: fn(&str) -> String,
) -> ServiceDefinition {
    ServiceDefinition {
        id: Cow::Borrowed(id),
        display_name: Cow::Borrowed(display_name),
        origin: Cow::Borrowed(origin),
        path_builder,
    }
}

// ── Built-in Table ──────────────────────────────────────────────────

fn amap_webapi(key: &str) -> String {
    format!("/v3/direction/walking?origin=116.434307,39.90909&destination=116.434446,39.90816&key={key}")
}

fn amap_jsapi(key: &str) -> String {
    format!("/v3/geocode/regeo?key={key}&s=rsv3&location=116.434446,39.90816&callback=jsonp_258885_&platform=JS")
}

fn amap_miniprogram(key: &str) -> String {
    format!(
        "/v3/geocode/regeo?key={key}&location=117.19674%2C39.14784&extensions=all&s=rsx\
         &platform=WXJS&appname=c589cf63f592ac13bcab35f8cd18f495&sdkversion=1.2.0&logversion=2.0"
    )
}

fn baidu_webapi(key: &str) -> String {
    format!("/place/v2/search?query=ATM机&tag=银行&region=北京&output=json&ak={key}")
}

// The iOS SDK signs requests with the bundle id as `mcode`.
fn baidu_webapi_ios(key: &str) -> String {
    format!("{}&mcode=com.didapinche.taxi", baidu_webapi(key))
}

fn tencent_webapi(key: &str) -> String {
    format!("/ws/place/v1/search?keyword=酒店&boundary=nearby(39.908491,116.374328,1000)&key={key}")
}

/// All services known to the engine, in display order.
pub static BUILTIN_SERVICES: &[ServiceDefinition] = &[
    service("amap-webapi", "高德webapi", AMAP_ORIGIN, amap_webapi),
    service("amap-jsapi", "高德jsapi", AMAP_ORIGIN, amap_jsapi),
    service("amap-miniprogram", "高德小程序定位", AMAP_ORIGIN, amap_miniprogram),
    service("baidu-webapi", "百度webapi", BAIDU_ORIGIN, baidu_webapi),
    service("baidu-webapi-ios", "百度webapiIOS版", BAIDU_ORIGIN, baidu_webapi_ios),
    service("tencent-webapi", "腾讯webapi", TENCENT_ORIGIN, tencent_webapi),
];

// ── Registry ────────────────────────────────────────────────────────

/// Read-only lookup over a set of service definitions.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<ServiceDefinition>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceDefinition>) -> Self {
        Self { services }
    }

    /// Registry over [`BUILTIN_SERVICES`].
    pub fn builtin() -> Self {
        Self::new(BUILTIN_SERVICES.to_vec())
    }

    /// Point every service at `origin` instead of its vendor host.
    pub fn rebased(mut self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/').to_string();
        for svc in &mut self.services {
            svc.origin = Cow::Owned(origin.clone());
        }
        self
    }

    pub fn resolve(&self, id: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.services.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.id.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
