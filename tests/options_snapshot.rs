use taylor_ode::Options;

#[test]
fn default_options_match_snapshot() {
    insta::assert_yaml_snapshot!(Options::default(), @r###"
    ---
    max_steps: 500
    parse_eqs: true
    dense: true
    max_splits: 10
    "###);
}
