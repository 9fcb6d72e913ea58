//! The unpack cursor - output id counter plus the known-outputs table.

use serde::{Deserialize, Serialize};

use crate::config::UnpackConfig;
use crate::socket::OutputId;

/// One output that input references can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownOutput {
    pub token: String,
    pub id: OutputId,
}

/// State threaded through successive unpack calls in one session.
///
/// Holds the last output id handed out and every output token seen so far,
/// in the order they were assigned. Unpacking the same records from the same
/// cursor always yields the same ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackCursor {
    last_output_id: u64,
    known_outputs: Vec<KnownOutput>,
}

impl UnpackCursor {
    /// A cursor whose first assigned id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cursor whose first assigned id is `last_output_id + 1`.
    pub fn starting_at(last_output_id: u64) -> Self {
        Self {
            last_output_id,
            known_outputs: Vec::new(),
        }
    }

    pub fn from_config(config: &UnpackConfig) -> Self {
        Self::starting_at(config.starting_output_id)
    }

    /// Register an output assigned outside this cursor, e.g. restored from
    /// a previous session. Later assignments continue past its id.
    pub fn with_known_output(mut self, token: impl Into<String>, id: OutputId) -> Self {
        self.known_outputs.push(KnownOutput {
            token: token.into(),
            id,
        });
        self.last_output_id = self.last_output_id.max(id.0);
        self
    }

    pub fn last_output_id(&self) -> u64 {
        self.last_output_id
    }

    pub fn known_outputs(&self) -> &[KnownOutput] {
        &self.known_outputs
    }

    /// Hand out the next id and record `token` against it.
    pub fn assign(&mut self, token: String) -> OutputId {
        self.last_output_id += 1;
        let id = OutputId(self.last_output_id);
        self.known_outputs.push(KnownOutput { token, id });
        id
    }

    /// Position of the first known output with this token.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.known_outputs.iter().position(|known| known.token == token)
    }

    /// Id of the first known output with this token.
    pub fn resolve(&self, token: &str) -> Option<OutputId> {
        self.position(token).map(|index| self.known_outputs[index].id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_is_monotonic() {
        let mut cursor = UnpackCursor::starting_at(10);

        assert_eq!(cursor.assign("a.out".into()), OutputId(11));
        assert_eq!(cursor.assign("b.out".into()), OutputId(12));
        assert_eq!(cursor.last_output_id(), 12);
        assert_eq!(cursor.known_outputs().len(), 2);
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let mut cursor = UnpackCursor::new();
        cursor.assign("dup.out".into());
        cursor.assign("dup.out".into());

        assert_eq!(cursor.resolve("dup.out"), Some(OutputId(1)));
        assert_eq!(cursor.position("dup.out"), Some(0));
        assert_eq!(cursor.resolve("missing"), None);
    }

    #[test]
    fn test_known_output_advances_counter() {
        let mut cursor = UnpackCursor::new().with_known_output("old.out", OutputId(40));

        assert_eq!(cursor.resolve("old.out"), Some(OutputId(40)));
        assert_eq!(cursor.assign("new.out".into()), OutputId(41));
    }
}
