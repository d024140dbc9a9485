//! Editable table tests: every edit must reach the compiler through the graph.
mod common;
use common::*;
use pipeforge::mapping::IntrospectionStatus;
use pipeforge::prelude::*;

#[cfg(test)]
mod mapping_tests {
    use super::*;

    #[test]
    fn test_add_row_n_times_gives_n_distinct_keys() {
        let registry = registry();
        for n in [1usize, 2, 10, 100] {
            let (mut graph, env) = env_graph(&registry, &[]);
            let mut table: EditableTable<EnvVariableRow> =
                EditableTable::load(&graph, &env, "variables").unwrap();
            let mut keys: Vec<String> =
                (0..n).map(|_| table.add_row(&mut graph).unwrap()).collect();
            assert_eq!(table.len(), n);
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), n);
        }
    }

    #[test]
    fn test_keys_stay_unique_after_deletes() {
        let registry = registry();
        let (mut graph, env) = env_graph(&registry, &[]);
        let mut table: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();
        let first = table.add_row(&mut graph).unwrap();
        let second = table.add_row(&mut graph).unwrap();
        table.delete_row(&mut graph, &second).unwrap();
        let third = table.add_row(&mut graph).unwrap();
        assert_ne!(third, first);
        assert_ne!(third, second);

        // Reloading from the graph continues after the highest key and name
        let mut reloaded: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();
        let fourth = reloaded.add_row(&mut graph).unwrap();
        assert!(reloaded.rows().filter(|r| r.key == fourth).count() == 1);
        let names: Vec<&str> = reloaded.rows().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ENV_0", "ENV_2", "ENV_3"]);
    }

    #[test]
    fn test_edits_reach_the_compiler() {
        let registry = registry();
        let (mut graph, env) = env_graph(&registry, &[]);
        let compiler = Compiler::new(&registry);
        let mut table: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();

        let key = table.add_row(&mut graph).unwrap();
        table
            .update_row(&mut graph, &key, EnvVariablePatch::name("REGION").with_value("eu-west-1"))
            .unwrap();
        assert!(compiler
            .compile(&graph)
            .unwrap()
            .render()
            .contains(r#"os.environ["REGION"] = "eu-west-1""#));

        table
            .update_row(&mut graph, &key, EnvVariablePatch::value("us-east-2"))
            .unwrap();
        let script = compiler.compile(&graph).unwrap().render();
        assert!(script.contains(r#"os.environ["REGION"] = "us-east-2""#));
        assert!(!script.contains("eu-west-1"));

        table.delete_row(&mut graph, &key).unwrap();
        assert!(!compiler.compile(&graph).unwrap().render().contains("REGION"));
    }

    #[test]
    fn test_update_after_delete_is_a_noop() {
        let registry = registry();
        let (mut graph, env) = env_graph(&registry, &[("A", "1")]);
        let mut table: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();
        let key = table.rows().next().unwrap().key.clone();
        table.delete_row(&mut graph, &key).unwrap();

        let before = graph.clone();
        assert!(!table
            .update_row(&mut graph, &key, EnvVariablePatch::value("2"))
            .unwrap());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_default_is_display_only() {
        let registry = registry();
        let (mut graph, env) = env_graph(&registry, &[]);
        let mut table: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();
        let key = table.add_row(&mut graph).unwrap();
        table
            .update_row(&mut graph, &key, EnvVariablePatch::name("TIMEOUT").with_default("30"))
            .unwrap();

        let script = Compiler::new(&registry).compile(&graph).unwrap();
        assert!(!script.render().contains("TIMEOUT"));
        assert_eq!(script.skipped.len(), 1);
    }

    #[test]
    fn test_duplicate_names_last_assignment_wins() {
        let registry = registry();
        let (graph, env) = env_graph(&registry, &[("TOKEN", "first"), ("TOKEN", "second")]);
        let table: EditableTable<EnvVariableRow> =
            EditableTable::load(&graph, &env, "variables").unwrap();
        assert_eq!(table.duplicate_names(), vec!["TOKEN"]);

        let body = Compiler::new(&registry).compile(&graph).unwrap().body_block();
        assert_eq!(
            body,
            "os.environ[\"TOKEN\"] = \"first\"\nos.environ[\"TOKEN\"] = \"second\""
        );
    }

    #[test]
    fn test_only_unresolved_rows_is_incomplete() {
        let registry = registry();
        let (mut graph, _source, mapping) = mapping_graph(&registry);
        let mut table: EditableTable<ColumnMappingRow> =
            EditableTable::load(&graph, &mapping, "mapping").unwrap();
        table.add_row(&mut graph).unwrap();
        table.add_row(&mut graph).unwrap();
        assert_eq!(table.incomplete_keys().len(), 2);

        match Compiler::new(&registry).compile(&graph) {
            Err(CompileError::IncompleteConfiguration { node_id, .. }) => {
                assert_eq!(node_id, mapping)
            }
            other => panic!("expected IncompleteConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_rows_never_reach_code() {
        let registry = registry();
        let (mut graph, _source, mapping) = mapping_graph(&registry);
        let mut table: EditableTable<ColumnMappingRow> =
            EditableTable::load(&graph, &mapping, "mapping").unwrap();
        table.apply_input_choices(vec![
            SchemaOption::named("cust_id", "int64"),
            SchemaOption::named("full name", "object"),
        ]);

        let resolved = table.add_row(&mut graph).unwrap();
        let unresolved = table.add_row(&mut graph).unwrap();
        table.select_input(&mut graph, &resolved, "cust_id").unwrap();
        table
            .update_row(&mut graph, &resolved, ColumnMappingPatch::output("customer_id", "int64"))
            .unwrap();
        table
            .update_row(&mut graph, &unresolved, ColumnMappingPatch::output("name", "object"))
            .unwrap();

        let script = Compiler::new(&registry).compile(&graph).unwrap().render();
        assert!(script.contains(
            r#"mapped1 = source1.rename(columns={"cust_id": "customer_id"})[["customer_id"]]"#
        ));
        assert!(!script.contains("\"name\""));
        assert_eq!(table.incomplete_keys(), vec![unresolved.as_str()]);
    }

    #[test]
    fn test_failure_keeps_previous_choices() {
        let mut table: EditableTable<ColumnMappingRow> = EditableTable::new("m", "mapping");
        table.apply_input_choices(vec![SchemaOption::named("id", "int64")]);
        table.mark_pending();
        table.receive_input_choices(Err(IntrospectionError::InvalidQuery("bad".to_string())));

        assert_eq!(table.choices(), &[SchemaOption::named("id", "int64")]);
        assert_eq!(
            table.status(),
            &IntrospectionStatus::Failed {
                message: "Probe query rejected by the backend: bad".to_string(),
                retryable: false
            }
        );
    }
}
