use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_lookup_indexes")
        .depends_on(&["0001_initial_schema"])
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_energy_data_criteria ON energy_data(criteria)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX IF NOT EXISTS idx_energy_data_criteria ON energy_data(criteria)",
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_energy_data_status ON energy_data(status)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX IF NOT EXISTS idx_energy_data_status ON energy_data(status)",
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_saved_analyses_user ON user_saved_analyses(user_id)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX IF NOT EXISTS idx_saved_analyses_user ON user_saved_analyses(user_id)",
                ),
        )
}
