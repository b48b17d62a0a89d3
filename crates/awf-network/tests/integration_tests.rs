use awf_network::firewall::FirewallInstaller;
use awf_network::provisioner::NetworkProvisioner;
use awf_types::NetworkConfig;

#[test]
fn provisioner_create_args_match_network_config_exactly() {
    let cfg = NetworkConfig::current();
    let args = NetworkProvisioner::create_args(&cfg);
    let joined = args.join(" ");
    assert!(joined.contains(cfg.subnet));
    assert!(joined.contains(cfg.bridge));
    assert!(joined.ends_with(cfg.network));
}

#[test]
fn v4_cage_never_opens_a_port_other_than_dns_and_squid() {
    let cfg = NetworkConfig::current();
    let squid_ip = cfg.squid_ip.parse().unwrap();
    let dns = vec!["8.8.8.8".parse().unwrap(), "8.8.4.4".parse().unwrap()];
    let rules = FirewallInstaller::v4_rules(&squid_ip, &dns);

    let accept_rules: Vec<String> = rules
        .iter()
        .map(|r| r.join(" "))
        .filter(|r| r.ends_with("ACCEPT"))
        .collect();

    for rule in &accept_rules {
        let names_a_port = rule.contains("--dport");
        if names_a_port {
            assert!(
                rule.contains("--dport 53") || rule.contains("--dport 3128"),
                "unexpected accepted port in rule: {rule}"
            );
        }
    }
}

#[test]
fn v4_cage_terminal_rules_reject_with_icmp_port_unreachable() {
    let cfg = NetworkConfig::current();
    let squid_ip = cfg.squid_ip.parse().unwrap();
    let rules = FirewallInstaller::v4_rules(&squid_ip, &[]);
    let last = rules.last().unwrap().join(" ");
    assert!(last.contains("REJECT"));
    assert!(last.contains("icmp-port-unreachable"));
}
