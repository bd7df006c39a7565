/// Version adapter chain
///
/// The chain is an ordered list of version-tagged records, oldest first.
/// Each record holds only the operations whose SQL differs from the record
/// before it; the oldest record (9.6) implements all of them. Resolving an
/// operation for a server walks from the newest record not newer than the
/// server back toward the oldest and takes the first implementation found.
use crate::connection::Statement;
use crate::core::{AdminError, CreateSequence, PropertyChanges, SequenceDefinition};

use super::{base, pg10, pg12, Capability, ServerVersion};

pub type SchemaNameFn = fn(&str, &str) -> Result<Statement, AdminError>;
pub type ListFn = fn(&str, bool) -> Result<Statement, AdminError>;
pub type SetvalFn = fn(&str, &str, i64) -> Result<Statement, AdminError>;
pub type CreateFn = fn(&str, &CreateSequence) -> Result<Statement, AdminError>;
pub type AlterTextFn = fn(&SequenceDefinition, &str) -> Result<Statement, AdminError>;
pub type AlterPropsFn = fn(&SequenceDefinition, &PropertyChanges) -> Result<Statement, AdminError>;
pub type AlterCommentFn = fn(&SequenceDefinition, Option<&str>) -> Result<Statement, AdminError>;
pub type DropFn = fn(&str, &str, bool) -> Result<Statement, AdminError>;
/// `Ok(None)`: the catalog has no such information for this version
pub type OptionalQueryFn = fn(&str, &str) -> Result<Option<Statement>, AdminError>;

/// Operations an adapter can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSequence,
    GetSequences,
    Nextval,
    Setval,
    Restart,
    Reset,
    Create,
    AlterName,
    AlterOwner,
    AlterSchema,
    AlterProperties,
    AlterComment,
    Drop,
    HasObjectIds,
    RelationKind,
}

impl Operation {
    pub const ALL: [Self; 15] = [
        Self::GetSequence,
        Self::GetSequences,
        Self::Nextval,
        Self::Setval,
        Self::Restart,
        Self::Reset,
        Self::Create,
        Self::AlterName,
        Self::AlterOwner,
        Self::AlterSchema,
        Self::AlterProperties,
        Self::AlterComment,
        Self::Drop,
        Self::HasObjectIds,
        Self::RelationKind,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetSequence => "get_sequence",
            Self::GetSequences => "get_sequences",
            Self::Nextval => "nextval",
            Self::Setval => "setval",
            Self::Restart => "restart",
            Self::Reset => "reset",
            Self::Create => "create",
            Self::AlterName => "alter_name",
            Self::AlterOwner => "alter_owner",
            Self::AlterSchema => "alter_schema",
            Self::AlterProperties => "alter_properties",
            Self::AlterComment => "alter_comment",
            Self::Drop => "drop",
            Self::HasObjectIds => "has_object_ids",
            Self::RelationKind => "relation_kind",
        }
    }
}

/// Statement templates supplied by one chain record; `None` delegates
#[derive(Clone, Copy)]
pub struct Overrides {
    pub get_sequence: Option<SchemaNameFn>,
    pub get_sequences: Option<ListFn>,
    pub nextval: Option<SchemaNameFn>,
    pub setval: Option<SetvalFn>,
    pub restart: Option<SchemaNameFn>,
    pub reset: Option<SetvalFn>,
    pub create: Option<CreateFn>,
    pub alter_name: Option<AlterTextFn>,
    pub alter_owner: Option<AlterTextFn>,
    pub alter_schema: Option<AlterTextFn>,
    pub alter_properties: Option<AlterPropsFn>,
    pub alter_comment: Option<AlterCommentFn>,
    pub drop: Option<DropFn>,
    pub has_object_ids: Option<OptionalQueryFn>,
    pub relation_kind: Option<OptionalQueryFn>,
}

impl Overrides {
    pub const NONE: Self = Self {
        get_sequence: None,
        get_sequences: None,
        nextval: None,
        setval: None,
        restart: None,
        reset: None,
        create: None,
        alter_name: None,
        alter_owner: None,
        alter_schema: None,
        alter_properties: None,
        alter_comment: None,
        drop: None,
        has_object_ids: None,
        relation_kind: None,
    };

    #[must_use]
    pub const fn implements(&self, op: Operation) -> bool {
        match op {
            Operation::GetSequence => self.get_sequence.is_some(),
            Operation::GetSequences => self.get_sequences.is_some(),
            Operation::Nextval => self.nextval.is_some(),
            Operation::Setval => self.setval.is_some(),
            Operation::Restart => self.restart.is_some(),
            Operation::Reset => self.reset.is_some(),
            Operation::Create => self.create.is_some(),
            Operation::AlterName => self.alter_name.is_some(),
            Operation::AlterOwner => self.alter_owner.is_some(),
            Operation::AlterSchema => self.alter_schema.is_some(),
            Operation::AlterProperties => self.alter_properties.is_some(),
            Operation::AlterComment => self.alter_comment.is_some(),
            Operation::Drop => self.drop.is_some(),
            Operation::HasObjectIds => self.has_object_ids.is_some(),
            Operation::RelationKind => self.relation_kind.is_some(),
        }
    }
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let implemented: Vec<&str> = Operation::ALL
            .iter()
            .filter(|op| self.implements(**op))
            .map(|op| op.name())
            .collect();
        f.debug_tuple("Overrides").field(&implemented).finish()
    }
}

/// One version-tagged record of the chain
#[derive(Debug, Clone, Copy)]
pub struct AdapterNode {
    pub version: ServerVersion,
    /// Capabilities first available in this version
    pub gains: &'static [Capability],
    /// Capabilities removed in this version
    pub drops: &'static [Capability],
    pub overrides: Overrides,
}

impl AdapterNode {
    const fn tag(major: u32, minor: u32) -> Self {
        Self {
            version: ServerVersion::new(major, minor),
            gains: &[],
            drops: &[],
            overrides: Overrides::NONE,
        }
    }
}

/// Known server versions, oldest first
pub static ADAPTER_CHAIN: [AdapterNode; 8] = [
    AdapterNode {
        version: ServerVersion::new(9, 6),
        gains: &[Capability::HasObjectIdentifiers],
        drops: &[],
        overrides: base::OVERRIDES,
    },
    AdapterNode {
        version: ServerVersion::new(10, 0),
        gains: &[Capability::SequenceCatalog],
        drops: &[],
        overrides: pg10::OVERRIDES,
    },
    AdapterNode::tag(11, 0),
    AdapterNode {
        version: ServerVersion::new(12, 0),
        gains: &[],
        drops: &[Capability::HasObjectIdentifiers],
        overrides: pg12::OVERRIDES,
    },
    AdapterNode::tag(13, 0),
    AdapterNode::tag(14, 0),
    AdapterNode::tag(15, 0),
    AdapterNode::tag(16, 0),
];

/// Answer of a capability lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityLookup {
    pub supported: bool,
    /// Record that declared the capability (gained or dropped it)
    pub declared_by: Option<ServerVersion>,
}

/// Resolved position in an adapter chain for one server version
///
/// Holds no connection and no mutable state; copies are free.
#[derive(Debug, Clone, Copy)]
pub struct VersionAdapter {
    chain: &'static [AdapterNode],
    index: usize,
}

impl VersionAdapter {
    /// Adapter for `version` in the built-in chain
    pub fn for_version(version: ServerVersion) -> Result<Self, AdminError> {
        Self::with_chain(&ADAPTER_CHAIN, version)
    }

    /// Adapter for the newest known version
    #[must_use]
    pub fn latest() -> Self {
        Self {
            chain: &ADAPTER_CHAIN,
            index: ADAPTER_CHAIN.len() - 1,
        }
    }

    /// Newest record in `chain` not newer than `version`
    ///
    /// Servers newer than every record get the newest one; servers older
    /// than the oldest record are unsupported.
    pub fn with_chain(
        chain: &'static [AdapterNode],
        version: ServerVersion,
    ) -> Result<Self, AdminError> {
        let index = chain
            .iter()
            .rposition(|node| node.version <= version)
            .ok_or_else(|| AdminError::UnsupportedVersion(version.to_string()))?;
        Ok(Self { chain, index })
    }

    /// Version tag of the selected record
    #[must_use]
    pub fn version(&self) -> ServerVersion {
        self.chain[self.index].version
    }

    /// Records from the selected one back to the oldest
    fn lineage(&self) -> impl Iterator<Item = &'static AdapterNode> {
        let chain = self.chain;
        chain[..=self.index].iter().rev()
    }

    /// Version of the record that actually implements `op`
    #[must_use]
    pub fn implementor(&self, op: Operation) -> Option<ServerVersion> {
        self.lineage()
            .find(|node| node.overrides.implements(op))
            .map(|node| node.version)
    }

    #[must_use]
    pub fn capability(&self, capability: Capability) -> CapabilityLookup {
        for node in self.lineage() {
            if node.drops.contains(&capability) {
                return CapabilityLookup {
                    supported: false,
                    declared_by: Some(node.version),
                };
            }
            if node.gains.contains(&capability) {
                return CapabilityLookup {
                    supported: true,
                    declared_by: Some(node.version),
                };
            }
        }
        CapabilityLookup {
            supported: false,
            declared_by: None,
        }
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capability(capability).supported
    }

    fn resolve<F>(&self, op: Operation, pick: impl Fn(&Overrides) -> Option<F>) -> Result<F, AdminError> {
        self.lineage()
            .find_map(|node| pick(&node.overrides))
            .ok_or_else(|| AdminError::UnsupportedOperation {
                operation: op.name(),
                version: self.version().to_string(),
            })
    }

    pub fn get_sequence(&self, schema: &str, sequence: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::GetSequence, |o| o.get_sequence)?(schema, sequence)
    }

    pub fn get_sequences(&self, schema: &str, all: bool) -> Result<Statement, AdminError> {
        self.resolve(Operation::GetSequences, |o| o.get_sequences)?(schema, all)
    }

    pub fn nextval(&self, schema: &str, sequence: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::Nextval, |o| o.nextval)?(schema, sequence)
    }

    pub fn setval(&self, schema: &str, sequence: &str, value: i64) -> Result<Statement, AdminError> {
        self.resolve(Operation::Setval, |o| o.setval)?(schema, sequence, value)
    }

    pub fn restart(&self, schema: &str, sequence: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::Restart, |o| o.restart)?(schema, sequence)
    }

    pub fn reset(&self, schema: &str, sequence: &str, min_value: i64) -> Result<Statement, AdminError> {
        self.resolve(Operation::Reset, |o| o.reset)?(schema, sequence, min_value)
    }

    pub fn create(&self, schema: &str, request: &CreateSequence) -> Result<Statement, AdminError> {
        self.resolve(Operation::Create, |o| o.create)?(schema, request)
    }

    pub fn alter_name(&self, seq: &SequenceDefinition, name: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::AlterName, |o| o.alter_name)?(seq, name)
    }

    pub fn alter_owner(&self, seq: &SequenceDefinition, owner: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::AlterOwner, |o| o.alter_owner)?(seq, owner)
    }

    pub fn alter_schema(&self, seq: &SequenceDefinition, schema: &str) -> Result<Statement, AdminError> {
        self.resolve(Operation::AlterSchema, |o| o.alter_schema)?(seq, schema)
    }

    pub fn alter_properties(
        &self,
        seq: &SequenceDefinition,
        changes: &PropertyChanges,
    ) -> Result<Statement, AdminError> {
        self.resolve(Operation::AlterProperties, |o| o.alter_properties)?(seq, changes)
    }

    pub fn alter_comment(
        &self,
        seq: &SequenceDefinition,
        comment: Option<&str>,
    ) -> Result<Statement, AdminError> {
        self.resolve(Operation::AlterComment, |o| o.alter_comment)?(seq, comment)
    }

    pub fn drop(&self, schema: &str, sequence: &str, cascade: bool) -> Result<Statement, AdminError> {
        self.resolve(Operation::Drop, |o| o.drop)?(schema, sequence, cascade)
    }

    pub fn has_object_ids(&self, schema: &str, table: &str) -> Result<Option<Statement>, AdminError> {
        self.resolve(Operation::HasObjectIds, |o| o.has_object_ids)?(schema, table)
    }

    /// `relkind` check run before the point lookup; `None` when the lookup
    /// already filters on `relkind` by itself
    pub fn relation_kind(&self, schema: &str, name: &str) -> Result<Option<Statement>, AdminError> {
        self.resolve(Operation::RelationKind, |o| o.relation_kind)?(schema, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq() -> SequenceDefinition {
        SequenceDefinition {
            name: "s1".to_string(),
            schema: "public".to_string(),
            owner: "alice".to_string(),
            last_value: 7,
            start_value: 1,
            increment_by: 1,
            min_value: 1,
            max_value: 500,
            cache_value: 1,
            is_cycled: false,
            comment: None,
        }
    }

    fn adapter(major: u32, minor: u32) -> VersionAdapter {
        VersionAdapter::for_version(ServerVersion::new(major, minor)).unwrap()
    }

    #[test]
    fn test_chain_is_ordered_oldest_first() {
        for pair in ADAPTER_CHAIN.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn test_oldest_record_implements_everything() {
        for op in Operation::ALL {
            assert!(ADAPTER_CHAIN[0].overrides.implements(op), "{}", op.name());
        }
    }

    #[test]
    fn test_selection() {
        assert_eq!(adapter(9, 6).version(), ServerVersion::new(9, 6));
        assert_eq!(adapter(10, 5).version(), ServerVersion::new(10, 0));
        assert_eq!(adapter(11, 22).version(), ServerVersion::new(11, 0));
        assert_eq!(adapter(17, 0).version(), ServerVersion::new(16, 0));
        assert!(matches!(
            VersionAdapter::for_version(ServerVersion::new(9, 5)),
            Err(AdminError::UnsupportedVersion(_))
        ));
        assert_eq!(VersionAdapter::latest().version(), ServerVersion::new(16, 0));
    }

    #[test]
    fn test_implementor_walks_toward_older_records() {
        let v11 = adapter(11, 0);
        assert_eq!(v11.implementor(Operation::GetSequence), Some(ServerVersion::new(10, 0)));
        assert_eq!(v11.implementor(Operation::AlterName), Some(ServerVersion::new(9, 6)));
        assert_eq!(v11.implementor(Operation::HasObjectIds), Some(ServerVersion::new(9, 6)));

        let v15 = adapter(15, 0);
        assert_eq!(v15.implementor(Operation::HasObjectIds), Some(ServerVersion::new(12, 0)));

        assert_eq!(v11.implementor(Operation::RelationKind), Some(ServerVersion::new(10, 0)));

        let v96 = adapter(9, 6);
        assert_eq!(v96.implementor(Operation::GetSequence), Some(ServerVersion::new(9, 6)));
        assert_eq!(v96.implementor(Operation::RelationKind), Some(ServerVersion::new(9, 6)));
    }

    #[test]
    fn test_capabilities() {
        let v96 = adapter(9, 6);
        assert!(v96.supports(Capability::HasObjectIdentifiers));
        assert!(!v96.supports(Capability::SequenceCatalog));
        assert_eq!(v96.capability(Capability::SequenceCatalog).declared_by, None);

        let v11 = adapter(11, 0);
        assert!(v11.supports(Capability::HasObjectIdentifiers));
        assert!(v11.supports(Capability::SequenceCatalog));
        assert_eq!(
            v11.capability(Capability::SequenceCatalog).declared_by,
            Some(ServerVersion::new(10, 0))
        );

        let v14 = adapter(14, 0);
        let oids = v14.capability(Capability::HasObjectIdentifiers);
        assert!(!oids.supported);
        assert_eq!(oids.declared_by, Some(ServerVersion::new(12, 0)));
    }

    #[test]
    fn test_delegated_sql_is_byte_identical() {
        let s = seq();
        let changes = PropertyChanges {
            max_value: Some(1000),
            ..PropertyChanges::default()
        };

        for node in &ADAPTER_CHAIN {
            let current = VersionAdapter::for_version(node.version).unwrap();
            for op in Operation::ALL {
                if node.overrides.implements(op) {
                    continue;
                }
                let ancestor =
                    VersionAdapter::for_version(current.implementor(op).unwrap()).unwrap();
                let render = |a: &VersionAdapter| -> Option<Statement> {
                    match op {
                        Operation::GetSequence => a.get_sequence("public", "s1").ok(),
                        Operation::GetSequences => a.get_sequences("public", false).ok(),
                        Operation::Nextval => a.nextval("public", "s1").ok(),
                        Operation::Setval => a.setval("public", "s1", 5).ok(),
                        Operation::Restart => a.restart("public", "s1").ok(),
                        Operation::Reset => a.reset("public", "s1", 1).ok(),
                        Operation::Create => a.create("public", &CreateSequence::new("s2")).ok(),
                        Operation::AlterName => a.alter_name(&s, "s2").ok(),
                        Operation::AlterOwner => a.alter_owner(&s, "bob").ok(),
                        Operation::AlterSchema => a.alter_schema(&s, "archive").ok(),
                        Operation::AlterProperties => a.alter_properties(&s, &changes).ok(),
                        Operation::AlterComment => a.alter_comment(&s, Some("ids")).ok(),
                        Operation::Drop => a.drop("public", "s1", true).ok(),
                        Operation::HasObjectIds => a.has_object_ids("public", "t1").ok().flatten(),
                        Operation::RelationKind => a.relation_kind("public", "s1").ok().flatten(),
                    }
                };
                assert_eq!(render(&current), render(&ancestor), "{} at {}", op.name(), node.version);
            }
        }
    }

    static TOY_CHAIN: [AdapterNode; 2] = [
        AdapterNode {
            version: ServerVersion::new(9, 6),
            gains: &[],
            drops: &[],
            overrides: Overrides {
                drop: Some(base::drop),
                ..Overrides::NONE
            },
        },
        AdapterNode::tag(13, 0),
    ];

    #[test]
    fn test_missing_implementation_is_unsupported() {
        let a = VersionAdapter::with_chain(&TOY_CHAIN, ServerVersion::new(13, 2)).unwrap();
        assert!(a.drop("public", "s1", false).is_ok());
        assert_eq!(a.implementor(Operation::Nextval), None);
        assert!(matches!(
            a.nextval("public", "s1"),
            Err(AdminError::UnsupportedOperation { operation: "nextval", .. })
        ));
    }
}
