//! The program currently being composed against.

use solana_program::pubkey::Pubkey;
use tracing::info;

use crate::error::SchemaError;
use crate::schema::{CallDefinition, Schema};

/// Owns the active schema and program address. Components receive it by
/// reference; reconfiguring swaps both at once.
#[derive(Debug, Clone)]
pub struct Session {
    schema: Schema,
    program_id: Pubkey,
}

impl Session {
    /// `program_id` overrides the address declared by the schema, if any.
    pub fn new(schema: Schema, program_id: Option<Pubkey>) -> Result<Self, SchemaError> {
        let program_id = program_id
            .or(schema.address)
            .ok_or(SchemaError::MissingProgramId)?;
        info!(program = %schema.name, %program_id, "session ready");
        Ok(Self { schema, program_id })
    }

    /// Replace the schema and program together.
    pub fn reconfigure(&mut self, schema: Schema, program_id: Option<Pubkey>) -> Result<(), SchemaError> {
        *self = Self::new(schema, program_id)?;
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn call(&self, name: &str) -> Option<&CallDefinition> {
        self.schema.call(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: &str = include_str!("../tests/fixtures/vault.json");
    const ESCROW: &str = include_str!("../tests/fixtures/legacy_escrow.json");

    #[test]
    fn declared_address_is_the_default() {
        let schema = Schema::from_json(VAULT).unwrap();
        let declared = schema.address.unwrap();
        assert_eq!(Session::new(schema.clone(), None).unwrap().program_id(), declared);

        let other = Pubkey::new_unique();
        assert_eq!(Session::new(schema, Some(other)).unwrap().program_id(), other);
    }

    #[test]
    fn schema_without_address_needs_one() {
        let schema = Schema::from_json(ESCROW).unwrap();
        assert!(matches!(Session::new(schema, None), Err(SchemaError::MissingProgramId)));
    }

    #[test]
    fn reconfigure_swaps_schema_and_program() {
        let mut session = Session::new(Schema::from_json(VAULT).unwrap(), None).unwrap();
        let program = Pubkey::new_unique();
        session
            .reconfigure(Schema::from_json(ESCROW).unwrap(), Some(program))
            .unwrap();
        assert_eq!(session.program_id(), program);
        assert!(session.call("deposit").is_none());
        assert!(session.call("makeOffer").is_some());
    }

    #[test]
    fn failed_reconfigure_keeps_the_old_session() {
        let mut session = Session::new(Schema::from_json(VAULT).unwrap(), None).unwrap();
        let before = session.program_id();
        assert!(session.reconfigure(Schema::from_json(ESCROW).unwrap(), None).is_err());
        assert_eq!(session.program_id(), before);
        assert!(session.call("deposit").is_some());
    }
}
