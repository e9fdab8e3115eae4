use std::collections::HashMap;

use crate::parse::StringCursor;

/// Bytes at the start of a stat body that carry no information ("splitnum" plus padding).
const SPLITNUM_PADDING_LEN: usize = 11;

/// Server status as obtained by a full stat query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusResponse {
    fields: HashMap<String, String>,
    players: Vec<String>,
}

/// Server mod and plugin list, parsed from the `plugins` field.
///
/// Servers format it as `<server mod>: <plugin>; <plugin>; ...`, or just the
/// server mod name when there are no plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModPlugins {
    pub server_mod: String,
    pub plugins: Vec<String>,
}

impl ModPlugins {
    pub fn parse(text: &str) -> Option<ModPlugins> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (server_mod, plugins) = match text.split_once(':') {
            Some((server_mod, plugins)) => (
                server_mod,
                plugins
                    .split(';')
                    .map(str::trim)
                    .filter(|plugin| !plugin.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            None => (text, Vec::new()),
        };

        Some(ModPlugins {
            server_mod: server_mod.trim().to_owned(),
            plugins,
        })
    }
}

impl StatusResponse {
    pub fn new(fields: HashMap<String, String>, players: Vec<String>) -> Self {
        StatusResponse { fields, players }
    }

    /// Parse the body of a stat response (everything after the 5-byte header).
    ///
    /// The key/value section ends at the first empty key. The `player_` marker
    /// after it is skipped, and every non-empty string up to the end of the
    /// buffer is a player name. Truncated bodies give partial results rather
    /// than errors.
    pub fn parse(body: &[u8]) -> StatusResponse {
        let data: &[u8] = body.get(SPLITNUM_PADDING_LEN..).unwrap_or(&[]);
        let mut cursor = StringCursor::new(data);

        let mut fields: HashMap<String, String> = HashMap::new();
        while let Some(key) = cursor.next() {
            if key.is_empty() {
                break;
            }
            let value: String = cursor.read_string();
            fields.insert(key, value);
        }

        // "player_"
        cursor.read_string();

        // empty names are skipped, not treated as the end of the list
        let players: Vec<String> = cursor.filter(|name| !name.is_empty()).collect();

        StatusResponse { fields, players }
    }

    /// All key/value pairs reported by the server.
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Online player names, in the order the server listed them.
    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn into_parts(self) -> (HashMap<String, String>, Vec<String>) {
        (self.fields, self.players)
    }

    /// Server MOTD.
    pub fn hostname(&self) -> Option<&str> {
        self.get("hostname")
    }

    /// Game type, `SMP` for Minecraft.
    pub fn game_type(&self) -> Option<&str> {
        self.get("gametype")
    }

    /// Game ID, `MINECRAFT` for Minecraft.
    pub fn game_id(&self) -> Option<&str> {
        self.get("game_id")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    pub fn plugins(&self) -> Option<ModPlugins> {
        self.get("plugins").and_then(ModPlugins::parse)
    }

    pub fn map(&self) -> Option<&str> {
        self.get("map")
    }

    pub fn num_players(&self) -> Option<u32> {
        self.get("numplayers")?.trim().parse().ok()
    }

    pub fn max_players(&self) -> Option<u32> {
        self.get("maxplayers")?.trim().parse().ok()
    }

    pub fn host_port(&self) -> Option<u16> {
        self.get("hostport")?.trim().parse().ok()
    }

    pub fn host_ip(&self) -> Option<&str> {
        self.get("hostip")
    }
}
