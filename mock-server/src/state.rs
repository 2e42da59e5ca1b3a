//! In-memory game state behind the mock endpoints.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::MockError;

pub const GAME_ID: u32 = 1000;
pub const PRIVATE_KEY: &str = "mock-private-key";

#[derive(Debug, Clone, Serialize)]
pub struct MockUser {
    pub id: u64,
    #[serde(rename = "type")]
    pub user_type: String,
    pub username: String,
    #[serde(skip)]
    pub token: String,
    #[serde(skip)]
    pub friends: Vec<u64>,
    pub avatar_url: String,
    pub signed_up: String,
    pub signed_up_timestamp: i64,
    pub last_logged_in: String,
    pub last_logged_in_timestamp: i64,
    pub status: String,
}

impl MockUser {
    pub fn new(id: u64, username: &str, token: &str) -> Self {
        Self {
            id,
            user_type: "User".to_string(),
            username: username.to_string(),
            token: token.to_string(),
            friends: Vec::new(),
            avatar_url: format!("https://m.gjcdn.net/user-avatar/60/{id}.png"),
            signed_up: "1 year ago".to_string(),
            signed_up_timestamp: 1_672_531_200,
            last_logged_in: "Online Now".to_string(),
            last_logged_in_timestamp: 1_700_000_000,
            status: "Active".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockTrophy {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MockTable {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub primary: bool,
}

#[derive(Debug, Clone)]
pub struct MockScore {
    pub table_id: u64,
    pub score: String,
    pub sort: i64,
    pub extra_data: String,
    pub user_id: Option<u64>,
    pub guest: String,
    pub stored_timestamp: i64,
}

/// Scope of a data-store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    Global,
    User(u64),
}

#[derive(Debug, Clone)]
pub struct MockState {
    pub game_id: u32,
    pub private_key: String,
    pub users: Vec<MockUser>,
    pub trophies: Vec<MockTrophy>,
    /// `(user_id, trophy_id)` pairs.
    pub achieved: HashSet<(u64, u64)>,
    pub tables: Vec<MockTable>,
    pub scores: Vec<MockScore>,
    pub data: HashMap<Store, BTreeMap<String, String>>,
    /// Users with an open session.
    pub sessions: HashSet<u64>,
}

impl MockState {
    /// Empty game with the given credentials.
    pub fn new(game_id: u32, private_key: &str) -> Self {
        Self {
            game_id,
            private_key: private_key.to_string(),
            users: Vec::new(),
            trophies: Vec::new(),
            achieved: HashSet::new(),
            tables: Vec::new(),
            scores: Vec::new(),
            data: HashMap::new(),
            sessions: HashSet::new(),
        }
    }

    /// Game `GAME_ID` with two friends, two trophies and two tables.
    pub fn with_fixtures() -> Self {
        let mut state = Self::new(GAME_ID, PRIVATE_KEY);

        let mut alice = MockUser::new(1, "alice", "alice-token");
        alice.friends = vec![2];
        let mut bob = MockUser::new(2, "bob", "bob-token");
        bob.friends = vec![1];
        state.users = vec![alice, bob];

        state.trophies = vec![
            MockTrophy {
                id: 1,
                title: "First Steps".to_string(),
                description: "Finish the tutorial.".to_string(),
                difficulty: "Bronze".to_string(),
            },
            MockTrophy {
                id: 2,
                title: "Completionist".to_string(),
                description: "Find every secret.".to_string(),
                difficulty: "Platinum".to_string(),
            },
        ];

        state.tables = vec![
            MockTable {
                id: 1,
                name: "Primary".to_string(),
                description: "High scores".to_string(),
                primary: true,
            },
            MockTable {
                id: 2,
                name: "Speedrun".to_string(),
                description: "Fastest clears".to_string(),
                primary: false,
            },
        ];
        state.scores = vec![MockScore {
            table_id: 1,
            score: "300 Jumps".to_string(),
            sort: 300,
            extra_data: String::new(),
            user_id: Some(2),
            guest: String::new(),
            stored_timestamp: 1_700_000_000,
        }];

        state
            .data
            .entry(Store::Global)
            .or_default()
            .insert("motd".to_string(), "Welcome!".to_string());
        state
    }

    pub fn user(&self, id: u64) -> Option<&MockUser> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_name(&self, username: &str) -> Option<&MockUser> {
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Check `username` + `user_token` and return the user id.
    pub fn authenticate(&self, username: &str, token: &str) -> Result<u64, MockError> {
        self.user_by_name(username)
            .filter(|u| u.token == token)
            .map(|u| u.id)
            .ok_or(MockError::NoSuchUser)
    }

    pub fn trophy(&self, id: u64) -> Result<&MockTrophy, MockError> {
        self.trophies
            .iter()
            .find(|t| t.id == id)
            .ok_or(MockError::NoSuchTrophy(id))
    }

    /// The table a score request targets; `None` or `0` means primary.
    pub fn table(&self, id: Option<u64>) -> Result<&MockTable, MockError> {
        match id.filter(|id| *id > 0) {
            Some(id) => self.tables.iter().find(|t| t.id == id),
            None => self.tables.iter().find(|t| t.primary),
        }
        .ok_or(MockError::NoSuchTable)
    }

    /// Scores of one table, best first.
    pub fn ranked(&self, table_id: u64) -> Vec<&MockScore> {
        let mut scores: Vec<&MockScore> =
            self.scores.iter().filter(|s| s.table_id == table_id).collect();
        scores.sort_by(|a, b| b.sort.cmp(&a.sort));
        scores
    }

    /// Rank `sort` would get on a table: one more than the number of
    /// strictly better scores.
    pub fn rank(&self, table_id: u64, sort: i64) -> usize {
        self.ranked(table_id).iter().filter(|s| s.sort > sort).count() + 1
    }

    pub fn store(&mut self, store: Store) -> &mut BTreeMap<String, String> {
        self.data.entry(store).or_default()
    }

    pub fn get_data(&self, store: Store, key: &str) -> Result<&String, MockError> {
        self.data
            .get(&store)
            .and_then(|s| s.get(key))
            .ok_or(MockError::NoSuchKey)
    }
}

/// Apply a data-store update operation to the stored value.
pub fn apply_operation(current: &str, operation: &str, value: &str) -> Result<String, MockError> {
    let numbers = || -> Result<(i64, i64), MockError> {
        let lhs = current.trim().parse().map_err(|_| MockError::NotNumeric)?;
        let rhs = value.trim().parse().map_err(|_| MockError::NotNumeric)?;
        Ok((lhs, rhs))
    };
    let result = match operation {
        "add" => {
            let (a, b) = numbers()?;
            a.checked_add(b)
        }
        "subtract" => {
            let (a, b) = numbers()?;
            a.checked_sub(b)
        }
        "multiply" => {
            let (a, b) = numbers()?;
            a.checked_mul(b)
        }
        "divide" => {
            let (a, b) = numbers()?;
            a.checked_div(b)
        }
        "append" => return Ok(format!("{current}{value}")),
        "prepend" => return Ok(format!("{value}{current}")),
        other => return Err(MockError::InvalidOperation(other.to_string())),
    };
    result
        .map(|n| n.to_string())
        .ok_or_else(|| MockError::InvalidOperation(operation.to_string()))
}

/// `*` matches any run of characters; everything else matches literally.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
