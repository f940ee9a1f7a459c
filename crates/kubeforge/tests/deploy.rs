use std::{
    cell::{Cell, RefCell},
    path::{Path, PathBuf},
};

use kubeforge::{
    auth::{AuthArgs, AuthProvider, IssueError, IssueRequest, IssuedCredentials},
    deploy::{
        API_MODEL_FILE_NAME, BoxedError, DeployCmd, DeployOptions, Deployer, DeploymentContext,
        Error, autofill::DEFAULT_OUTPUT_BASE,
    },
};
use kubeforge_apimodel::{ContainerService, Loader, api::ServicePrincipalProfile};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

const SIMPLE_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/kubernetes.json");

const CLIENT_ID: &str = "DEC923E3-1EF1-4745-9516-37906D56DEC4";
const CLIENT_SECRET: &str = "DEC923E3-1EF1-4745-9516-37906D56DEC4";

/// Issues `app-id` / `client-secret` and counts how often it was asked to.
#[derive(Default)]
struct MockAuthProvider {
    issued: Cell<usize>,
}

impl AuthProvider for MockAuthProvider {
    fn issue(&self, _request: &IssueRequest) -> Result<IssuedCredentials, IssueError> {
        self.issued.set(self.issued.get() + 1);
        Ok(IssuedCredentials {
            client_id: "app-id".to_owned(),
            secret: "client-secret".to_owned(),
            object_id: None,
        })
    }
}

#[derive(Default)]
struct MockDeployer {
    deployed: RefCell<Option<DeploymentContext>>,
}

impl Deployer for MockDeployer {
    fn deploy(&self, context: &DeploymentContext) -> Result<(), BoxedError> {
        self.deployed.replace(Some(context.clone()));
        Ok(())
    }
}

enum DnsPrefix<'a> {
    Missing,
    Empty,
    Set(&'a str),
}

/// Builds the example API model. `service_principal` of `None` leaves out the
/// whole profile.
fn api_model(
    dns_prefix: DnsPrefix<'_>,
    use_managed_identity: bool,
    service_principal: Option<(&str, &str)>,
) -> Vec<u8> {
    let mut model = json!({
        "apiVersion": "vlabs",
        "properties": {
            "orchestratorProfile": {
                "orchestratorType": "Kubernetes",
                "kubernetesConfig": {
                    "useManagedIdentity": use_managed_identity,
                    "etcdVersion": "2.3.8"
                }
            },
            "masterProfile": {"count": 1, "vmSize": "Standard_D2_v2"},
            "agentPoolProfiles": [{
                "name": "linuxpool1",
                "count": 2,
                "vmSize": "Standard_D2_v2",
                "availabilityProfile": "AvailabilitySet"
            }],
            "windowsProfile": {"adminUsername": "azureuser", "adminPassword": "replacepassword1234$"},
            "linuxProfile": {"adminUsername": "azureuser", "ssh": {"publicKeys": [{"keyData": ""}]}}
        }
    });

    let properties = &mut model["properties"];
    match dns_prefix {
        DnsPrefix::Missing => {}
        DnsPrefix::Empty => properties["masterProfile"]["dnsPrefix"] = json!(""),
        DnsPrefix::Set(prefix) => properties["masterProfile"]["dnsPrefix"] = json!(prefix),
    }
    if let Some((client_id, secret)) = service_principal {
        properties["servicePrincipalProfile"] = json!({"clientId": client_id, "secret": secret});
    }

    serde_json::to_vec_pretty(&model).expect("example API model serializes")
}

#[fixture]
fn workspace() -> TempDir {
    tempfile::tempdir().expect("create temporary directory")
}

/// Options as `deploy --output-directory <workspace>/_test_output
/// --force-overwrite --location westus` would produce them.
fn options(workspace: &TempDir) -> DeployOptions {
    DeployOptions {
        api_model: Some(PathBuf::from("./this/is/unused.json")),
        dns_prefix: None,
        auto_suffix: false,
        output_directory: Some(workspace.path().join("_test_output")),
        base_output_directory: workspace.path().join(DEFAULT_OUTPUT_BASE),
        ca_certificate_path: None,
        ca_private_key_path: None,
        resource_group: None,
        location: "westus".to_owned(),
        force_overwrite: true,
        set: Vec::new(),
        auth: AuthArgs::default(),
    }
}

fn with_client_credentials(options: DeployOptions) -> DeployOptions {
    DeployOptions {
        auth: AuthArgs {
            client_id: Some(CLIENT_ID.to_owned()),
            client_secret: Some(CLIENT_SECRET.to_owned()),
            ..AuthArgs::default()
        },
        ..options
    }
}

fn service_principal(context: &DeploymentContext) -> Option<&ServicePrincipalProfile> {
    context
        .container_service
        .properties
        .service_principal_profile
        .as_ref()
}

#[rstest]
#[case::without_managed_identity_creates_credentials(false, "", "")]
#[case::with_managed_identity_skips_credentials(true, "", "")]
#[case::allows_prespecified_credentials(false, "clientID", "clientSecret")]
fn credential_handling(
    workspace: TempDir,
    #[case] use_managed_identity: bool,
    #[case] client_id: &str,
    #[case] secret: &str,
) {
    let model = api_model(
        DnsPrefix::Empty,
        use_managed_identity,
        Some((client_id, secret)),
    );
    let options = DeployOptions {
        dns_prefix: Some("dnsPrefix1".to_owned()),
        ..options(&workspace)
    };
    let auth_provider = MockAuthProvider::default();

    // Loading autofills and validates the model
    let context = options
        .load_api_model(&model, &auth_provider)
        .expect("autofilled API model is valid");

    let profile = service_principal(&context);
    if use_managed_identity {
        assert!(profile.is_none_or(ServicePrincipalProfile::is_empty));
        assert_eq!(auth_provider.issued.get(), 0);
    } else {
        let profile = profile.expect("credentials are populated");
        assert!(profile.is_complete());
        if client_id.is_empty() {
            assert_eq!(profile.client_id, "app-id");
            assert_eq!(profile.secret, "client-secret");
        } else {
            assert_eq!(profile.client_id, client_id);
            assert_eq!(profile.secret, secret);
            assert_eq!(auth_provider.issued.get(), 0);
        }
    }
}

#[rstest]
fn managed_identity_ignores_command_line_credentials(workspace: TempDir) {
    let model = api_model(DnsPrefix::Set("mytestcluster"), true, None);
    let options = with_client_credentials(options(&workspace));

    let context = options
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("autofilled API model is valid");

    assert_eq!(service_principal(&context), None);
}

#[rstest]
fn auto_suffix_with_dns_prefix_in_api_model(workspace: TempDir) {
    let model = api_model(
        DnsPrefix::Set("mytestcluster"),
        false,
        Some(("clientID", "clientSecret")),
    );
    let options = DeployOptions {
        auto_suffix: true,
        ..options(&workspace)
    };

    let context = options
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("autofilled API model is valid");

    let dns_prefix = &context.container_service.properties.master_profile.dns_prefix;
    assert_ne!(dns_prefix, "mytestcluster");
    assert!(dns_prefix.starts_with("mytestcluster-"));
    assert_eq!(&context.resource_group, dns_prefix);
}

#[rstest]
#[case::without_profile(None)]
#[case::with_empty_profile(Some(("", "")))]
fn command_line_credentials_fill_the_profile(
    workspace: TempDir,
    #[case] profile: Option<(&str, &str)>,
) {
    let model = api_model(DnsPrefix::Set("mytestcluster"), false, profile);
    let options = with_client_credentials(options(&workspace));
    let auth_provider = MockAuthProvider::default();

    let context = options
        .load_api_model(&model, &auth_provider)
        .expect("autofilled API model is valid");

    let profile = service_principal(&context).expect("profile is populated");
    assert_eq!(profile.client_id, CLIENT_ID);
    assert_eq!(profile.secret, CLIENT_SECRET);
    assert_eq!(auth_provider.issued.get(), 0);
}

#[rstest]
fn without_profile_and_command_line_credentials_profile_stays_absent(workspace: TempDir) {
    let model = api_model(DnsPrefix::Set("mytestcluster"), false, None);

    let context = options(&workspace)
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("autofilled API model is valid");

    assert_eq!(service_principal(&context), None);
}

#[rstest]
fn empty_profile_without_command_line_credentials_is_issued(workspace: TempDir) {
    let model = api_model(DnsPrefix::Set("mytestcluster"), false, Some(("", "")));
    let auth_provider = MockAuthProvider::default();

    let context = options(&workspace)
        .load_api_model(&model, &auth_provider)
        .expect("autofilled API model is valid");

    let profile = service_principal(&context).expect("profile is populated");
    assert_eq!(profile.client_id, "app-id");
    assert_eq!(profile.secret, "client-secret");
    assert_eq!(auth_provider.issued.get(), 1);
}

#[rstest]
fn output_directory_defaults_to_dns_prefix(workspace: TempDir) {
    let model = api_model(DnsPrefix::Missing, false, Some(("clientID", "clientSecret")));
    let options = DeployOptions {
        dns_prefix: Some("dnsPrefix1".to_owned()),
        output_directory: None,
        ..options(&workspace)
    };

    let context = options
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("autofilled API model is valid");

    assert_eq!(
        context.output_directory,
        workspace.path().join(DEFAULT_OUTPUT_BASE).join("dnsPrefix1")
    );
    assert!(context.output_directory.is_dir());
}

#[rstest]
fn missing_dns_prefix_is_rejected(workspace: TempDir) {
    let model = api_model(DnsPrefix::Missing, false, Some(("clientID", "clientSecret")));

    let result = options(&workspace).load_api_model(&model, &MockAuthProvider::default());
    assert!(matches!(result, Err(Error::Validate { .. })));
}

#[rstest]
#[case::set_in_one_flag(&["masterProfile.count=3,linuxProfile.adminUsername=testuser"])]
#[case::set_in_multiple_flags(&["masterProfile.count=3", "linuxProfile.adminUsername=testuser"])]
fn merge_api_model_applies_set_values(workspace: TempDir, #[case] set: &[&str]) {
    let options = DeployOptions {
        api_model: Some(PathBuf::from(SIMPLE_MODEL)),
        set: set.iter().map(ToString::to_string).collect(),
        ..options(&workspace)
    };

    let merged = options.merge_api_model().expect("merge succeeds");
    let container_service = load(&merged);

    let properties = &container_service.properties;
    assert_eq!(properties.master_profile.count, 3);
    assert_eq!(
        properties
            .linux_profile
            .as_ref()
            .map(|linux| linux.admin_username.as_str()),
        Some("testuser")
    );
}

#[rstest]
fn merge_api_model_overrides_sequence_elements(workspace: TempDir) {
    let options = DeployOptions {
        api_model: Some(PathBuf::from(SIMPLE_MODEL)),
        set: vec!["agentPoolProfiles[0].count=1".to_owned()],
        ..options(&workspace)
    };

    let merged = options.merge_api_model().expect("merge succeeds");
    let container_service = load(&merged);

    assert_eq!(container_service.properties.agent_pool_profiles[0].count, 1);
    assert_eq!(
        container_service.properties.agent_pool_profiles[0].name,
        "agentpool1"
    );
}

#[rstest]
fn merge_api_model_without_set_keeps_the_model(workspace: TempDir) {
    let options = DeployOptions {
        api_model: Some(PathBuf::from(SIMPLE_MODEL)),
        ..options(&workspace)
    };

    let merged = options.merge_api_model().expect("merge succeeds");
    let original = std::fs::read(SIMPLE_MODEL).expect("fixture is readable");
    assert_eq!(merged, original);
}

#[rstest]
fn merge_api_model_rejects_malformed_set_values(workspace: TempDir) {
    let options = DeployOptions {
        api_model: Some(PathBuf::from(SIMPLE_MODEL)),
        set: vec!["masterProfile.count".to_owned()],
        ..options(&workspace)
    };

    assert!(matches!(
        options.merge_api_model(),
        Err(Error::MergeApiModel { .. })
    ));
}

#[rstest]
fn merge_api_model_falls_back_to_the_default_model(workspace: TempDir) {
    let options = DeployOptions {
        api_model: None,
        set: vec!["masterProfile.dnsPrefix=fromset".to_owned()],
        ..options(&workspace)
    };

    let merged = options.merge_api_model().expect("merge succeeds");
    let container_service = load(&merged);
    assert_eq!(container_service.properties.master_profile.dns_prefix, "fromset");
}

#[rstest]
fn location_must_match_the_api_model(workspace: TempDir) {
    let mut model: serde_json::Value =
        serde_json::from_slice(&api_model(DnsPrefix::Set("mytestcluster"), false, None))
            .expect("example API model is JSON");
    model["location"] = json!("West Europe");
    let model = serde_json::to_vec(&model).expect("model serializes");

    let result = options(&workspace).load_api_model(&model, &MockAuthProvider::default());
    assert!(matches!(result, Err(Error::LocationMismatch { .. })));

    let options = DeployOptions {
        location: "westeurope".to_owned(),
        ..options(&workspace)
    };
    let context = options
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("normalized locations match");
    assert_eq!(context.location, "westeurope");
    assert_eq!(context.container_service.location, "westeurope");
}

#[rstest]
fn existing_certificate_authority_is_used(workspace: TempDir) {
    let certificate_path = workspace.path().join("existing.crt");
    let private_key_path = workspace.path().join("existing.key");
    std::fs::write(&certificate_path, "certificate").expect("write certificate");
    std::fs::write(&private_key_path, "private key").expect("write private key");

    let model = api_model(DnsPrefix::Set("mytestcluster"), false, None);
    let options = DeployOptions {
        ca_certificate_path: Some(certificate_path.clone()),
        ca_private_key_path: Some(private_key_path.clone()),
        ..options(&workspace)
    };

    let context = options
        .load_api_model(&model, &MockAuthProvider::default())
        .expect("autofilled API model is valid");

    let profile = context
        .container_service
        .properties
        .certificate_profile
        .as_ref()
        .expect("certificate profile is populated");
    assert_eq!(profile.ca_certificate, "certificate");
    assert_eq!(profile.ca_private_key, "private key");
    assert_eq!(context.ca_certificate_path, Some(certificate_path));
    assert_eq!(context.ca_private_key_path, Some(private_key_path));
}

#[rstest]
#[case::certificate_only(true, false)]
#[case::private_key_only(false, true)]
fn certificate_authority_paths_come_in_pairs(
    workspace: TempDir,
    #[case] with_certificate: bool,
    #[case] with_private_key: bool,
) {
    let model = api_model(DnsPrefix::Set("mytestcluster"), false, None);
    let options = DeployOptions {
        ca_certificate_path: with_certificate.then(|| workspace.path().join("existing.crt")),
        ca_private_key_path: with_private_key.then(|| workspace.path().join("existing.key")),
        ..options(&workspace)
    };

    let result = options.load_api_model(&model, &MockAuthProvider::default());
    if with_certificate {
        assert!(matches!(result, Err(Error::MissingCaPrivateKeyPath)));
    } else {
        assert!(matches!(result, Err(Error::MissingCaCertificatePath)));
    }
}

#[rstest]
fn deploy_cmd_run(workspace: TempDir) {
    let output_directory = workspace.path().join("_test_output");
    let command = DeployCmd {
        api_model: Some(PathBuf::from(SIMPLE_MODEL)),
        output_directory: Some(output_directory.clone()),
        force_overwrite: true,
        location: Some("westus".to_owned()),
        auth: AuthArgs {
            client_id: Some("b829b379-ca1f-4f1d-91a2-0d26b244680d".to_owned()),
            client_secret: Some("0se43bie-3zs5-303e-aav5-dcf231vb82ds".to_owned()),
            subscription_id: Some("6dc93fae-9a76-421f-bbe5-cc6460ea81cb".to_owned()),
            credential_helper: None,
        },
        ..DeployCmd::default()
    };
    let deployer = MockDeployer::default();

    command
        .execute(&MockAuthProvider::default(), &deployer)
        .expect("deploy succeeds");

    let context = deployer
        .deployed
        .take()
        .expect("deployer received the context");
    assert_eq!(context.output_directory, output_directory);
    assert_eq!(context.resource_group, "simple");
    assert_eq!(
        service_principal(&context).map(|profile| profile.client_id.as_str()),
        Some("b829b379-ca1f-4f1d-91a2-0d26b244680d")
    );
    assert!(
        context
            .ssh_private_key_path
            .as_deref()
            .is_some_and(Path::is_file)
    );

    // The persisted API model is the final, autofilled one
    let persisted = std::fs::read(output_directory.join(API_MODEL_FILE_NAME))
        .expect("api model was written");
    assert_eq!(load(&persisted), context.container_service);
}

fn load(contents: &[u8]) -> ContainerService {
    Loader::new()
        .load(contents)
        .expect("merged API model loads")
        .0
}
