//! Code-system routing: which table and column a code lands in.

use std::collections::BTreeMap;

use hedis_model::CodeSystem;
use hedis_model::columns::RX_TABLE;

/// Where codes of one system are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRoute {
    /// Overrides the component's target table when set.
    pub table: Option<String>,
    pub column: String,
}

impl CodeRoute {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn table_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// The final table/column for one generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub table: String,
    pub code_column: String,
    pub date_column: String,
}

/// Mapping from code system to output column, plus per-table date columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<CodeSystem, CodeRoute>,
    fallback_column: String,
    date_columns: BTreeMap<String, String>,
    default_date_column: String,
}

impl Default for RoutingTable {
    fn default() -> Self {
        let routes = [
            (CodeSystem::Cpt, CodeRoute::column("CPT_1")),
            (CodeSystem::Hcpcs, CodeRoute::column("HCPCS_1")),
            (CodeSystem::Icd10Cm, CodeRoute::column("DIAG_I_1")),
            (CodeSystem::Icd10Pcs, CodeRoute::column("PROC_I_1")),
            (CodeSystem::Loinc, CodeRoute::column("LOINC")),
            (CodeSystem::Snomed, CodeRoute::column("SNOMED")),
            (CodeSystem::Cvx, CodeRoute::column("CVX")),
            (CodeSystem::Ubrev, CodeRoute::column("REV_CODE")),
            (CodeSystem::Pos, CodeRoute::column("POS")),
            (CodeSystem::Ndc, CodeRoute::table_column(RX_TABLE, "RX_NDC")),
            (
                CodeSystem::RxNorm,
                CodeRoute::table_column(RX_TABLE, "RX_RXNORM"),
            ),
        ];
        let date_columns = [("LAB", "LAB_SCR_DT"), (RX_TABLE, "RX_SERV_DT")];
        Self {
            routes: routes.into_iter().collect(),
            fallback_column: "CODE".to_string(),
            date_columns: date_columns
                .into_iter()
                .map(|(table, column)| (table.to_string(), column.to_string()))
                .collect(),
            default_date_column: "SERV_DT".to_string(),
        }
    }
}

impl RoutingTable {
    #[must_use]
    pub fn with_route(mut self, system: CodeSystem, route: CodeRoute) -> Self {
        self.routes.insert(system, route);
        self
    }

    #[must_use]
    pub fn with_date_column(mut self, table: &str, column: impl Into<String>) -> Self {
        self.date_columns
            .insert(table.trim().to_ascii_uppercase(), column.into());
        self
    }

    #[must_use]
    pub fn with_fallback_column(mut self, column: impl Into<String>) -> Self {
        self.fallback_column = column.into();
        self
    }

    pub fn route(&self, system: &CodeSystem) -> Option<&CodeRoute> {
        self.routes.get(system)
    }

    pub fn date_column(&self, table: &str) -> &str {
        self.date_columns
            .get(&table.trim().to_ascii_uppercase())
            .unwrap_or(&self.default_date_column)
    }

    /// Where a code of `system` for a component targeting `target_table` goes.
    ///
    /// A column override keeps the component's table and ignores the system.
    pub fn place(
        &self,
        system: &CodeSystem,
        target_table: &str,
        override_column: Option<&str>,
    ) -> Placement {
        let (table, code_column) = match (override_column, self.route(system)) {
            (Some(column), _) => (target_table.to_string(), column.to_string()),
            (None, Some(route)) => (
                route
                    .table
                    .clone()
                    .unwrap_or_else(|| target_table.to_string()),
                route.column.clone(),
            ),
            (None, None) => (target_table.to_string(), self.fallback_column.clone()),
        };
        let table = table.trim().to_ascii_uppercase();
        let date_column = self.date_column(&table).to_string();
        Placement {
            table,
            code_column,
            date_column,
        }
    }
}
