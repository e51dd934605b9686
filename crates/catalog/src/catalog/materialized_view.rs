// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use moose_core::{Metadata, ResourceId, Schema};
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, SqlDependency, SqlResource, SqlResourceKind, TableRef, TableToCreate, require_name},
	engine::EngineConfig,
	error::{CatalogError, ResourceKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
	Second,
	Minute,
	Hour,
	Day,
	Week,
}

impl Display for TimeUnit {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			TimeUnit::Second => f.write_str("SECOND"),
			TimeUnit::Minute => f.write_str("MINUTE"),
			TimeUnit::Hour => f.write_str("HOUR"),
			TimeUnit::Day => f.write_str("DAY"),
			TimeUnit::Week => f.write_str("WEEK"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
	pub value: u32,
	pub unit: TimeUnit,
}

impl TimeSpan {
	pub fn new(value: u32, unit: TimeUnit) -> Self {
		Self {
			value,
			unit,
		}
	}
}

impl Display for TimeSpan {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.value, self.unit)
	}
}

/// `Every` refreshes at fixed times; `After` waits the span since the last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshInterval {
	Every(TimeSpan),
	After(TimeSpan),
}

impl RefreshInterval {
	pub fn span(&self) -> TimeSpan {
		match self {
			RefreshInterval::Every(span) | RefreshInterval::After(span) => *span,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
	pub interval: RefreshInterval,
	pub offset: Option<TimeSpan>,
	pub randomize: Option<TimeSpan>,
	/// Names of scheduled views refreshed before this one.
	pub depends_on: Vec<String>,
	pub append: bool,
}

impl RefreshConfig {
	pub fn every(value: u32, unit: TimeUnit) -> Self {
		Self::with_interval(RefreshInterval::Every(TimeSpan::new(value, unit)))
	}

	pub fn after(value: u32, unit: TimeUnit) -> Self {
		Self::with_interval(RefreshInterval::After(TimeSpan::new(value, unit)))
	}

	fn with_interval(interval: RefreshInterval) -> Self {
		Self {
			interval,
			offset: None,
			randomize: None,
			depends_on: vec![],
			append: false,
		}
	}

	fn clause(&self) -> String {
		let mut clause = match self.interval {
			RefreshInterval::Every(span) => format!("REFRESH EVERY {}", span),
			RefreshInterval::After(span) => format!("REFRESH AFTER {}", span),
		};
		if let Some(offset) = self.offset {
			clause.push_str(&format!(" OFFSET {}", offset));
		}
		if let Some(randomize) = self.randomize {
			clause.push_str(&format!(" RANDOMIZE FOR {}", randomize));
		}
		if !self.depends_on.is_empty() {
			let names: Vec<String> = self.depends_on.iter().map(|name| format!("`{}`", name)).collect();
			clause.push_str(&format!(" DEPENDS ON {}", names.join(", ")));
		}
		if self.append {
			clause.push_str(" APPEND");
		}
		clause
	}
}

/// Where a materialized view writes.
#[derive(Debug, Clone)]
pub enum MvTarget {
	Existing(TableRef),
	/// Created together with the view.
	Inline(TableToCreate),
}

#[derive(Debug, Clone, Default)]
pub struct MaterializedViewToCreate {
	pub name: String,
	pub select_statement: String,
	pub select_tables: Vec<SqlDependency>,
	pub target_table: Option<MvTarget>,
	/// Deprecated: name of an inline target built from `schema`, `engine` and `order_by_fields`.
	pub table_name: Option<String>,
	pub schema: Option<Schema>,
	pub engine: Option<EngineConfig>,
	pub order_by_fields: Vec<String>,
	/// `None` makes the view incremental.
	pub refresh: Option<RefreshConfig>,
	pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterializedViewRef {
	pub name: String,
	pub target: TableRef,
}

#[derive(Debug, Clone)]
pub struct MaterializedView {
	pub target: TableRef,
	pub select_statement: String,
	pub refresh: Option<RefreshConfig>,
}

impl MaterializedView {
	pub fn is_incremental(&self) -> bool {
		self.refresh.is_none()
	}

	pub fn is_scheduled(&self) -> bool {
		self.refresh.is_some()
	}
}

impl Catalog {
	#[instrument(name = "catalog::materialized_view::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_materialized_view(&mut self, to_create: MaterializedViewToCreate) -> Result<MaterializedViewRef> {
		let name = to_create.name;
		let kind = ResourceKind::MaterializedView;
		require_name(kind, &name)?;
		if to_create.select_statement.trim().is_empty() {
			return Err(CatalogError::MissingField {
				kind,
				name,
				field: "selectStatement",
			}
			.into());
		}

		let target = match (to_create.target_table, to_create.table_name) {
			(Some(_), Some(_)) => {
				return Err(CatalogError::MutuallyExclusive {
					kind,
					name,
					first: "targetTable",
					second: "tableName",
				}
				.into());
			}
			(Some(target), None) => target,
			(None, Some(table_name)) => MvTarget::Inline(TableToCreate {
				name: table_name,
				schema: to_create.schema,
				engine: to_create.engine,
				order_by_fields: to_create.order_by_fields,
				..Default::default()
			}),
			(None, None) => {
				return Err(CatalogError::MissingField {
					kind,
					name,
					field: "targetTable",
				}
				.into());
			}
		};

		let target_name = match &target {
			MvTarget::Existing(table) => &table.name,
			MvTarget::Inline(table) => &table.name,
		};
		if *target_name == name {
			return Err(invalid(&name, "targetTable", "the target table must not share the view's name"));
		}
		if let MvTarget::Existing(table) = &target {
			if !self.tables.contains_key(&table.key()) {
				return Err(CatalogError::NotFound {
					kind: ResourceKind::Table,
					name: table.name.clone(),
					version: table.version.clone(),
				}
				.into());
			}
		}

		if let Some(refresh) = &to_create.refresh {
			let spans = std::iter::once(("interval", Some(refresh.interval.span())))
				.chain([("offset", refresh.offset), ("randomize", refresh.randomize)]);
			for (field, span) in spans {
				if span.is_some_and(|span| span.value == 0) {
					return Err(invalid(&name, field, "must be a positive integer"));
				}
			}
			if matches!(refresh.interval, RefreshInterval::After(_)) && refresh.offset.is_some() {
				return Err(invalid(&name, "offset", "OFFSET is only allowed with REFRESH EVERY"));
			}
			if refresh.depends_on.iter().any(|dependency| *dependency == name) {
				return Err(invalid(&name, "dependsOn", "a view cannot depend on itself"));
			}

			let engine = match &target {
				MvTarget::Existing(table) => self.tables.get(&table.key()).map(|existing| existing.engine.clone()),
				MvTarget::Inline(table) => table.engine.clone(),
			};
			if let Some(engine) = engine.filter(|engine| !engine.is_default()) {
				return Err(CatalogError::UnsupportedEngine {
					kind,
					name,
					engine: engine.name().to_string(),
					reason: "scheduled views only support the default MergeTree engine on their target".to_string(),
				}
				.into());
			}
		}

		// claim the view name before creating an inline target
		let id = ResourceId::unversioned(name.clone());
		self.check_available(&self.sql_resources, kind, &id, &id.key())?;

		let target = match target {
			MvTarget::Existing(table) => table,
			MvTarget::Inline(table) => self.create_table(table)?,
		};

		let mut setup = format!("CREATE MATERIALIZED VIEW IF NOT EXISTS `{}`", name);
		if let Some(refresh) = &to_create.refresh {
			setup.push(' ');
			setup.push_str(&refresh.clause());
		}
		setup.push_str(&format!(" TO {} AS {}", target.reference(), to_create.select_statement.trim()));

		let metadata = self.resolve_metadata(to_create.metadata);
		self.register_sql_resource(SqlResource {
			name: name.clone(),
			kind: SqlResourceKind::MaterializedView,
			setup: vec![setup],
			teardown: vec![format!("DROP VIEW IF EXISTS `{}`", name)],
			pulls_data_from: to_create.select_tables,
			pushes_data_to: vec![SqlDependency::Table(target.clone())],
			metadata,
			materialized: Some(MaterializedView {
				target: target.clone(),
				select_statement: to_create.select_statement,
				refresh: to_create.refresh,
			}),
		})?;

		Ok(MaterializedViewRef {
			name,
			target,
		})
	}

	pub fn find_materialized_view(&self, name: &str) -> Option<&MaterializedView> {
		self.sql_resources.get(name).and_then(|resource| resource.materialized.as_ref())
	}
}

fn invalid(name: &str, field: &'static str, reason: &str) -> moose_type::Error {
	CatalogError::InvalidValue {
		kind: ResourceKind::MaterializedView,
		name: name.to_string(),
		field,
		reason: reason.to_string(),
	}
	.into()
}

#[cfg(test)]
mod tests {
	use moose_core::{CatalogConfig, Column, DataType};

	use super::*;

	fn create_test_schema() -> Schema {
		Schema::new(vec![Column::new("day", DataType::Date), Column::new("total", DataType::Int64)])
	}

	fn create_test_catalog() -> (Catalog, TableRef) {
		let mut catalog = Catalog::new(CatalogConfig::builder().capture_source_location(false).build());
		let events = catalog.create_table(TableToCreate::new("events", create_test_schema())).unwrap();
		(catalog, events)
	}

	fn inline(name: &str, engine: Option<EngineConfig>) -> Option<MvTarget> {
		Some(MvTarget::Inline(TableToCreate {
			engine,
			..TableToCreate::new(name, create_test_schema())
		}))
	}

	fn scheduled(refresh: RefreshConfig, engine: Option<EngineConfig>) -> MaterializedViewToCreate {
		MaterializedViewToCreate {
			name: "daily_mv".to_string(),
			select_statement: "SELECT day, count() AS total FROM events GROUP BY day".to_string(),
			target_table: inline("daily", engine),
			refresh: Some(refresh),
			..Default::default()
		}
	}

	#[test]
	fn test_incremental_view_creates_target() {
		let (mut catalog, events) = create_test_catalog();
		let mv = catalog
			.create_materialized_view(MaterializedViewToCreate {
				name: "daily_mv".to_string(),
				select_statement: "SELECT day, count() AS total FROM events GROUP BY day".to_string(),
				select_tables: vec![SqlDependency::table(&events)],
				target_table: inline("daily", None),
				..Default::default()
			})
			.unwrap();

		assert!(catalog.find_table("daily").is_some());
		let resource = catalog.find_sql_resource(&mv.name).unwrap();
		assert_eq!(
			resource.setup[0],
			"CREATE MATERIALIZED VIEW IF NOT EXISTS `daily_mv` TO `daily` AS SELECT day, count() AS total FROM events GROUP BY day"
		);
		assert_eq!(resource.teardown, vec!["DROP VIEW IF EXISTS `daily_mv`"]);
		assert_eq!(resource.pushes_data_to, vec![SqlDependency::Table(mv.target.clone())]);
		assert!(catalog.find_materialized_view("daily_mv").unwrap().is_incremental());
	}

	#[test]
	fn test_scheduled_clause() {
		let (mut catalog, _) = create_test_catalog();
		let mut refresh = RefreshConfig::every(1, TimeUnit::Hour);
		refresh.offset = Some(TimeSpan::new(5, TimeUnit::Minute));
		refresh.randomize = Some(TimeSpan::new(10, TimeUnit::Second));
		refresh.depends_on = vec!["hourly_mv".to_string()];
		refresh.append = true;

		catalog.create_materialized_view(scheduled(refresh, None)).unwrap();
		let setup = &catalog.find_sql_resource("daily_mv").unwrap().setup[0];
		assert!(setup.contains(
			"REFRESH EVERY 1 HOUR OFFSET 5 MINUTE RANDOMIZE FOR 10 SECOND DEPENDS ON `hourly_mv` APPEND TO `daily`"
		));
	}

	#[test]
	fn test_scheduled_rejects_custom_engine() {
		let (mut catalog, _) = create_test_catalog();
		let engine = EngineConfig::ReplacingMergeTree {
			ver: None,
			is_deleted: None,
		};
		let err = catalog.create_materialized_view(scheduled(RefreshConfig::every(1, TimeUnit::Hour), Some(engine))).unwrap_err();
		assert_eq!(err.code(), "CATALOG_009");
		assert!(catalog.find_table("daily").is_none());

		// an explicit MergeTree is the default engine
		catalog
			.create_materialized_view(scheduled(RefreshConfig::every(1, TimeUnit::Hour), Some(EngineConfig::MergeTree)))
			.unwrap();
	}

	#[test]
	fn test_scheduled_rejects_existing_target_with_custom_engine() {
		let (mut catalog, _) = create_test_catalog();
		let target = catalog
			.create_table(TableToCreate {
				engine: Some(EngineConfig::AggregatingMergeTree),
				..TableToCreate::new("daily", create_test_schema())
			})
			.unwrap();
		let err = catalog
			.create_materialized_view(MaterializedViewToCreate {
				target_table: Some(MvTarget::Existing(target)),
				..scheduled(RefreshConfig::after(1, TimeUnit::Day), None)
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_009");
	}

	#[test]
	fn test_offset_requires_every() {
		let (mut catalog, _) = create_test_catalog();
		let mut refresh = RefreshConfig::after(30, TimeUnit::Minute);
		refresh.offset = Some(TimeSpan::new(5, TimeUnit::Minute));
		let err = catalog.create_materialized_view(scheduled(refresh, None)).unwrap_err();
		assert!(err.message.contains("OFFSET"));

		catalog.create_materialized_view(scheduled(RefreshConfig::after(30, TimeUnit::Minute), None)).unwrap();
		let setup = &catalog.find_sql_resource("daily_mv").unwrap().setup[0];
		assert!(setup.contains("REFRESH AFTER 30 MINUTE TO"));
	}

	#[test]
	fn test_positive_values() {
		let (mut catalog, _) = create_test_catalog();
		let err = catalog.create_materialized_view(scheduled(RefreshConfig::every(0, TimeUnit::Hour), None)).unwrap_err();
		assert_eq!(err.code(), "CATALOG_007");

		let mut refresh = RefreshConfig::every(1, TimeUnit::Hour);
		refresh.randomize = Some(TimeSpan::new(0, TimeUnit::Second));
		let err = catalog.create_materialized_view(scheduled(refresh, None)).unwrap_err();
		assert!(err.message.contains("'randomize'"));
	}

	#[test]
	fn test_target_rules() {
		let (mut catalog, events) = create_test_catalog();
		let base = || MaterializedViewToCreate {
			name: "daily_mv".to_string(),
			select_statement: "SELECT 1".to_string(),
			..Default::default()
		};

		let err = catalog.create_materialized_view(base()).unwrap_err();
		assert_eq!(err.code(), "CATALOG_005");
		assert!(err.message.contains("'targetTable'"));

		let err = catalog
			.create_materialized_view(MaterializedViewToCreate {
				target_table: Some(MvTarget::Existing(events.clone())),
				table_name: Some("daily".to_string()),
				..base()
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_006");

		let err = catalog
			.create_materialized_view(MaterializedViewToCreate {
				target_table: inline("daily_mv", None),
				..base()
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_007");
	}

	#[test]
	fn test_incremental_view_needs_registered_target() {
		let (mut catalog, events) = create_test_catalog();
		let missing = TableRef {
			name: "daily".to_string(),
			version: None,
			database: None,
		};
		let err = catalog
			.create_materialized_view(MaterializedViewToCreate {
				name: "daily_mv".to_string(),
				select_statement: "SELECT count() FROM events".to_string(),
				target_table: Some(MvTarget::Existing(missing)),
				..Default::default()
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_014");
		assert!(catalog.find_materialized_view("daily_mv").is_none());

		let view = catalog
			.create_materialized_view(MaterializedViewToCreate {
				name: "events_mv".to_string(),
				select_statement: "SELECT * FROM events".to_string(),
				target_table: Some(MvTarget::Existing(events.clone())),
				..Default::default()
			})
			.unwrap();
		assert_eq!(view.target, events);
	}

	#[test]
	fn test_deprecated_table_name() {
		let (mut catalog, _) = create_test_catalog();
		let mv = catalog
			.create_materialized_view(MaterializedViewToCreate {
				name: "daily_mv".to_string(),
				select_statement: "SELECT 1".to_string(),
				table_name: Some("daily".to_string()),
				schema: Some(create_test_schema()),
				order_by_fields: vec!["day".to_string()],
				..Default::default()
			})
			.unwrap();
		assert_eq!(mv.target.name, "daily");
		assert!(catalog.find_table("daily").is_some());
	}

	#[test]
	fn test_duplicate_view_leaves_no_orphan_target() {
		let (mut catalog, _) = create_test_catalog();
		let to_create = |target: &str| MaterializedViewToCreate {
			name: "daily_mv".to_string(),
			select_statement: "SELECT 1".to_string(),
			target_table: inline(target, None),
			..Default::default()
		};
		catalog.create_materialized_view(to_create("daily")).unwrap();
		let err = catalog.create_materialized_view(to_create("daily_again")).unwrap_err();
		assert_eq!(err.code(), "CATALOG_001");
		assert!(catalog.find_table("daily_again").is_none());
	}
}
