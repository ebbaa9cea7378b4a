//! Remote draw log client
//!
//! The game exposes the player's draw history through an authenticated
//! paginated endpoint. The credential material travels inside a "player
//! URL" the player copies out of the game; [`RetrievalParams`] extracts
//! the interesting query pairs once, and [`GachaLogClient`] replays them
//! against the log endpoint one page at a time.

use crate::error::{PitystatError, Result};
use crate::sync::{DEFAULT_PAGE_SIZE, PageFetcher};
use crate::types::{AccountId, BannerKind, DrawId, Game, ItemCategory, PullRecord, Rarity};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Time format the log API uses, server-local with no zone
const API_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Query parameters extracted from a player URL
///
/// Every credential field is optional; only the pairs present in the
/// pasted URL are replayed. The page cursor fields (`page`, `size`,
/// `gacha_type`, `end_id`) are always overridden per request, and `lang`
/// is forced to English so item names match the rate-up window data.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Endpoint without its query part
    pub endpoint: String,
    /// Game whose `gacha_type` numbering applies
    pub game: Game,
    /// Authentication key
    pub auth_key: Option<String>,
    /// Authentication key version
    pub auth_key_ver: Option<String>,
    /// Signature scheme
    pub sign_type: Option<String>,
    /// Authenticated app id
    pub auth_appid: Option<String>,
    /// Windowed-mode flag the game client includes
    pub win_mode: Option<String>,
    /// Gacha id the URL was grabbed from
    pub gacha_id: Option<String>,
    /// Timestamp of the grabbed URL
    pub timestamp: Option<String>,
    /// Server region
    pub region: Option<String>,
    /// Default gacha type of the grabbed URL
    pub default_gacha_type: Option<String>,
    /// Operating system the URL was grabbed on
    pub os_system: Option<String>,
    /// Device model the URL was grabbed on
    pub device_model: Option<String>,
    /// Platform type
    pub plat_type: Option<String>,
    /// Game business region identifier
    pub game_biz: Option<String>,
    /// Device type
    pub device_type: Option<String>,
    /// Client init type
    pub init_type: Option<String>,
    /// Game client version
    pub game_version: Option<String>,
}

impl RetrievalParams {
    /// Extract retrieval parameters from a pasted player URL
    pub fn from_player_url(url: &str, game: Game) -> Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| PitystatError::InvalidUrl(format!("{url}: {err}")))?;
        if parsed.query().is_none() {
            return Err(PitystatError::InvalidUrl(
                "URL carries no query parameters".to_string(),
            ));
        }

        let mut pairs: HashMap<String, String> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut endpoint = parsed.clone();
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        let mut take = |key: &str| pairs.remove(key);
        Ok(Self {
            endpoint: endpoint.to_string(),
            game,
            auth_key: take("authkey"),
            auth_key_ver: take("authkey_ver"),
            sign_type: take("sign_type"),
            auth_appid: take("auth_appid"),
            win_mode: take("win_mode"),
            gacha_id: take("gacha_id"),
            timestamp: take("timestamp"),
            region: take("region"),
            default_gacha_type: take("default_gacha_type"),
            os_system: take("os_system"),
            device_model: take("device_model"),
            plat_type: take("plat_type"),
            game_biz: take("game_biz"),
            device_type: take("device_type"),
            init_type: take("init_type"),
            game_version: take("game_version"),
        })
    }

    /// Query pairs for one page request
    pub fn page_query(
        &self,
        kind: BannerKind,
        end_id: DrawId,
        page: u32,
        size: usize,
    ) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push_opt = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        };
        push_opt("authkey_ver", &self.auth_key_ver);
        push_opt("sign_type", &self.sign_type);
        push_opt("auth_appid", &self.auth_appid);
        push_opt("win_mode", &self.win_mode);
        push_opt("gacha_id", &self.gacha_id);
        push_opt("timestamp", &self.timestamp);
        push_opt("region", &self.region);
        push_opt("default_gacha_type", &self.default_gacha_type);
        push_opt("authkey", &self.auth_key);
        push_opt("os_system", &self.os_system);
        push_opt("device_model", &self.device_model);
        push_opt("plat_type", &self.plat_type);
        push_opt("game_biz", &self.game_biz);
        push_opt("device_type", &self.device_type);
        push_opt("init_type", &self.init_type);
        push_opt("game_version", &self.game_version);

        pairs.push(("lang".to_string(), "en".to_string()));
        pairs.push(("page".to_string(), page.to_string()));
        pairs.push(("size".to_string(), size.to_string()));
        pairs.push((
            "gacha_type".to_string(),
            kind.log_type_id(self.game).to_string(),
        ));
        pairs.push(("end_id".to_string(), end_id.to_string()));
        pairs
    }
}

/// Envelope every log API response arrives in
#[derive(Debug, Deserialize)]
struct LogResponse {
    retcode: i32,
    #[serde(default)]
    message: String,
    data: Option<LogPage>,
}

/// Payload of a successful page response
///
/// Star Rail reports the records under `entries`, Genshin under `list`;
/// whichever is non-empty wins.
#[derive(Debug, Default, Deserialize)]
struct LogPage {
    #[serde(default)]
    entries: Vec<RawLogEntry>,
    #[serde(default)]
    list: Vec<RawLogEntry>,
}

impl LogPage {
    fn into_records(self) -> Vec<RawLogEntry> {
        if !self.entries.is_empty() {
            self.entries
        } else {
            self.list
        }
    }
}

/// One record as the API serializes it, every field a string
#[derive(Debug, Deserialize)]
struct RawLogEntry {
    uid: String,
    gacha_id: String,
    item_id: String,
    time: String,
    name: String,
    item_type: String,
    rank_type: String,
    id: String,
}

impl RawLogEntry {
    fn into_record(self, kind: BannerKind) -> Result<PullRecord> {
        let timestamp = NaiveDateTime::parse_from_str(&self.time, API_TIME_FORMAT)
            .map_err(|_| malformed("time", &self.time))?;
        let rank: u8 = self
            .rank_type
            .parse()
            .map_err(|_| malformed("rank_type", &self.rank_type))?;
        Ok(PullRecord {
            account_id: AccountId::new(parse_u64("uid", &self.uid)?),
            draw_id: DrawId::new(parse_u64("id", &self.id)?),
            banner: kind,
            item_id: parse_u64("item_id", &self.item_id)? as u32,
            item_name: self.name,
            category: ItemCategory::parse(&self.item_type)?,
            rarity: Rarity::try_from(rank)?,
            timestamp,
            source_gacha_id: parse_u64("gacha_id", &self.gacha_id)? as u32,
        })
    }
}

fn parse_u64(field: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| malformed(field, value))
}

fn malformed(field: &str, value: &str) -> PitystatError {
    PitystatError::MalformedResponse(format!("{field} = {value:?}"))
}

/// HTTP page fetcher over the game's draw log endpoint
pub struct GachaLogClient {
    client: reqwest::Client,
    params: RetrievalParams,
}

impl GachaLogClient {
    /// Create a client replaying the given retrieval parameters
    pub fn new(params: RetrievalParams) -> Self {
        Self {
            client: reqwest::Client::new(),
            params,
        }
    }

    /// The retrieval parameters this client replays
    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }
}

#[async_trait]
impl PageFetcher for GachaLogClient {
    async fn fetch_page(
        &self,
        kind: BannerKind,
        end_id: DrawId,
        page: u32,
    ) -> Result<Vec<PullRecord>> {
        let mut url = reqwest::Url::parse(&self.params.endpoint)
            .map_err(|err| PitystatError::InvalidUrl(format!("{}: {err}", self.params.endpoint)))?;
        url.query_pairs_mut()
            .extend_pairs(self.params.page_query(kind, end_id, page, DEFAULT_PAGE_SIZE));

        debug!("Fetching {kind} page {page} (end_id {end_id})");
        let response: LogResponse = self.client.get(url).send().await?.json().await?;

        if response.retcode != 0 {
            return Err(PitystatError::Remote(response.message));
        }
        response
            .data
            .unwrap_or_default()
            .into_records()
            .into_iter()
            .map(|raw| raw.into_record(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_URL: &str = "https://api-takumi.example.com/common/gacha_record/api/getGachaLog?authkey_ver=1&sign_type=2&authkey=abc%2Fdef&region=prod_official_asia&game_biz=hkrpg_global&lang=ja";

    #[test]
    fn test_params_from_player_url() {
        let params = RetrievalParams::from_player_url(PLAYER_URL, Game::HonkaiStarRail).unwrap();
        assert_eq!(
            params.endpoint,
            "https://api-takumi.example.com/common/gacha_record/api/getGachaLog"
        );
        assert_eq!(params.auth_key.as_deref(), Some("abc/def"));
        assert_eq!(params.region.as_deref(), Some("prod_official_asia"));
        assert_eq!(params.device_model, None);
    }

    #[test]
    fn test_url_without_query_rejected() {
        let err = RetrievalParams::from_player_url(
            "https://api-takumi.example.com/getGachaLog",
            Game::HonkaiStarRail,
        )
        .unwrap_err();
        assert!(matches!(err, PitystatError::InvalidUrl(_)));
    }

    #[test]
    fn test_page_query_overrides_cursor_and_lang() {
        let params = RetrievalParams::from_player_url(PLAYER_URL, Game::HonkaiStarRail).unwrap();
        let pairs = params.page_query(BannerKind::Character, DrawId::new(42), 3, 5);

        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("gacha_type"), Some("11"));
        assert_eq!(get("page"), Some("3"));
        assert_eq!(get("size"), Some("5"));
        assert_eq!(get("end_id"), Some("42"));
        // pasted lang=ja is replaced
        assert_eq!(get("lang"), Some("en"));
    }

    #[test]
    fn test_raw_entry_conversion() {
        let raw = RawLogEntry {
            uid: "700123456".to_string(),
            gacha_id: "2003".to_string(),
            item_id: "1102".to_string(),
            time: "2024-06-01 21:15:33".to_string(),
            name: "Seele".to_string(),
            item_type: "Character".to_string(),
            rank_type: "5".to_string(),
            id: "4503200012345".to_string(),
        };
        let record = raw.into_record(BannerKind::Character).unwrap();
        assert_eq!(record.account_id, AccountId::new(700123456));
        assert_eq!(record.rarity, Rarity::Five);
        assert_eq!(record.timestamp.to_string(), "2024-06-01 21:15:33");
    }

    #[test]
    fn test_malformed_rank_rejected() {
        let raw = RawLogEntry {
            uid: "1".to_string(),
            gacha_id: "1".to_string(),
            item_id: "1".to_string(),
            time: "2024-06-01 21:15:33".to_string(),
            name: "Seele".to_string(),
            item_type: "Character".to_string(),
            rank_type: "five".to_string(),
            id: "1".to_string(),
        };
        assert!(raw.into_record(BannerKind::Character).is_err());
    }

    #[test]
    fn test_response_envelope_parsing() {
        let body = r#"{
            "retcode": 0,
            "message": "OK",
            "data": {
                "page": "1",
                "size": "5",
                "list": [{
                    "uid": "700123456",
                    "gacha_id": "2003",
                    "gacha_type": "11",
                    "item_id": "1102",
                    "count": "1",
                    "time": "2024-06-01 21:15:33",
                    "name": "Seele",
                    "lang": "en",
                    "item_type": "Character",
                    "rank_type": "5",
                    "id": "4503200012345"
                }]
            }
        }"#;
        let response: LogResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.retcode, 0);
        assert_eq!(response.data.unwrap().into_records().len(), 1);
    }

    #[test]
    fn test_error_envelope_has_message() {
        let body = r#"{"retcode": -110, "message": "visit too frequently", "data": null}"#;
        let response: LogResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.retcode, -110);
        assert_eq!(response.message, "visit too frequently");
    }
}
