//! Compose submission
//!
//! Turns a compose request into jobs: a manifest job and a build job per
//! image, plus the init and finalize jobs around them when the compose is
//! imported into Koji. The request is validated completely before the first
//! job is enqueued.

use composer_core::domain::image::{ARCHITECTURES, ImageType, RepoConfig, UploadType};
use composer_core::domain::target::{
    AwsS3TargetOptions, AwsTargetOptions, AzureImageTargetOptions, ContainerTargetOptions,
    GcpTargetOptions, KojiTargetOptions, OciObjectStorageTargetOptions, OsbuildArtifact, Target,
    TargetOptions, WorkerServerTargetOptions,
};
use composer_core::domain::worker::{KojiFinalizeJob, KojiInitJob, ManifestJobById, OsBuildJob};
use composer_core::dto::ObjectReference;
use composer_core::dto::compose::{
    AwsEc2UploadOptions, AwsS3UploadOptions, AzureUploadOptions, ComposeId, ComposeRequest,
    ContainerUploadOptions, GcpUploadOptions, ImageRequest, Koji, LocalUploadOptions, Repository,
};
use rand::Rng;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::Config;
use crate::service::BASE_PATH;
use crate::service::chain::KojiChain;
use crate::service::error::ComposerError;
use crate::service::workers::Workers;

/// A validated image of the compose, ready to be enqueued
struct ImageBuild {
    image_type: ImageType,
    manifest: ManifestJobById,
    build: OsBuildJob,
}

/// Submits a compose, returning the id to poll its status with
pub async fn submit_compose(
    workers: &Workers,
    config: &Config,
    request: ComposeRequest,
    channel: &str,
) -> Result<ComposeId, ComposerError> {
    if !config.is_known_distribution(&request.distribution) {
        return Err(ComposerError::UnsupportedDistribution(request.distribution));
    }

    let image_requests = match (request.image_request, request.image_requests) {
        (Some(single), None) => vec![single],
        (None, Some(many)) if !many.is_empty() => many,
        _ => return Err(ComposerError::InvalidNumberOfImageBuilds),
    };

    let customizations = request.customizations.unwrap_or_default();
    let customizations_value = serde_json::to_value(&customizations)
        .map_err(|e| ComposerError::BodyDecoding(e.to_string()))?;

    // Every image of a compose is resolved with the same seed
    let seed = rand::thread_rng().gen_range(0..i64::MAX);

    let mut images = Vec::with_capacity(image_requests.len());
    for ir in &image_requests {
        if !ARCHITECTURES.contains(&ir.architecture.as_str()) {
            return Err(ComposerError::UnsupportedArchitecture(ir.architecture.clone()));
        }

        let mut repositories = ir
            .repositories
            .iter()
            .map(repo_config)
            .collect::<Result<Vec<_>, _>>()?;
        for payload in &customizations.payload_repositories {
            let mut repo = repo_config(payload)?;
            repo.package_sets = ir.image_type.payload_package_sets();
            repositories.push(repo);
        }

        let mut targets = Vec::new();
        match &ir.upload_options {
            Some(options) => targets.push(upload_target(config, ir, options)?),
            None if request.koji.is_none() => return Err(ComposerError::MissingUploadTarget),
            None => {}
        }

        images.push(ImageBuild {
            image_type: ir.image_type,
            manifest: ManifestJobById {
                distribution: request.distribution.clone(),
                architecture: ir.architecture.clone(),
                image_type: ir.image_type.internal_name().to_string(),
                repositories,
                customizations: Some(customizations_value.clone()),
                seed,
            },
            build: OsBuildJob {
                manifest: None,
                targets,
                pipeline_names: ir.image_type.pipeline_names(),
            },
        });
    }

    let id = match request.koji {
        Some(koji) => enqueue_koji_compose(workers, koji, images, channel).await?,
        None => enqueue_compose(workers, images, channel).await?,
    };

    tracing::info!("Job ID {} enqueued for {}", id, request.distribution);

    Ok(ComposeId {
        reference: ObjectReference::new(format!("{}/compose", BASE_PATH), id, "ComposeId"),
    })
}

/// Enqueues one manifest and one build job per image
///
/// Returns the first build job; further images of the compose can only be
/// followed through their own jobs.
async fn enqueue_compose(
    workers: &Workers,
    images: Vec<ImageBuild>,
    channel: &str,
) -> Result<Uuid, ComposerError> {
    let mut first = None;
    for image in images {
        let manifest = workers.enqueue(&image.manifest, vec![], channel).await?;
        let build = workers.enqueue(&image.build, vec![manifest], channel).await?;
        first.get_or_insert(build);
    }

    // `images` is never empty once the request is validated
    first.ok_or(ComposerError::InvalidNumberOfImageBuilds)
}

/// Enqueues the Koji chain of a compose and returns its finalize job
async fn enqueue_koji_compose(
    workers: &Workers,
    koji: Koji,
    images: Vec<ImageBuild>,
    channel: &str,
) -> Result<Uuid, ComposerError> {
    let init = workers
        .enqueue(
            &KojiInitJob {
                server: koji.server.clone(),
                name: koji.name.clone(),
                version: koji.version.clone(),
                release: koji.release.clone(),
            },
            vec![],
            channel,
        )
        .await?;

    let koji_directory = format!("osbuild-cg/osbuild-composer-koji-{}", Uuid::new_v4());
    let mut koji_filenames = Vec::with_capacity(images.len());
    let mut builds = Vec::with_capacity(images.len());

    for mut image in images {
        let filename = format!(
            "{}-{}-{}.{}{}",
            koji.name,
            koji.version,
            koji.release,
            image.manifest.architecture,
            split_extension(image.image_type.filename())
        );
        image.build.targets.push(Target::new(
            filename.clone(),
            artifact(image.image_type),
            TargetOptions::Koji(KojiTargetOptions {
                server: koji.server.clone(),
                upload_directory: koji_directory.clone(),
            }),
        ));
        koji_filenames.push(filename);

        let manifest = workers.enqueue(&image.manifest, vec![init], channel).await?;
        let build = workers
            .enqueue(&image.build, vec![init, manifest], channel)
            .await?;
        builds.push(build);
    }

    let finalize = KojiFinalizeJob {
        server: koji.server,
        name: koji.name,
        version: koji.version,
        release: koji.release,
        koji_filenames,
        koji_directory,
        task_id: koji.task_id,
        start_time: u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default(),
    };

    workers
        .enqueue(
            &finalize,
            KojiChain::finalize_dependencies(init, &builds),
            channel,
        )
        .await
}

/// Target an image is delivered to, from the upload options of the request
fn upload_target(
    config: &Config,
    ir: &ImageRequest,
    options: &serde_json::Value,
) -> Result<Target, ComposerError> {
    let image_type = ir.image_type;

    let local = serde_json::from_value::<LocalUploadOptions>(options.clone())
        .map(|o| o.local_save)
        .unwrap_or(false);
    if local {
        if !config.local_save {
            return Err(ComposerError::LocalSaveNotEnabled);
        }
        return Ok(Target::new(
            image_type.filename(),
            artifact(image_type),
            TargetOptions::WorkerServer(WorkerServerTargetOptions {}),
        ));
    }

    let upload_type = image_type.default_upload_type();
    let key = format!("composer-api-{}", Uuid::new_v4());

    let (image_name, options) = match upload_type {
        UploadType::Aws => {
            let o: AwsEc2UploadOptions = upload_options(upload_type, options)?;
            (
                o.snapshot_name.clone().unwrap_or_else(|| key.clone()),
                TargetOptions::Aws(AwsTargetOptions {
                    region: o.region,
                    key,
                    share_with_accounts: o.share_with_accounts,
                    snapshot_name: o.snapshot_name,
                }),
            )
        }
        UploadType::AwsS3 => {
            let o: AwsS3UploadOptions = upload_options(upload_type, options)?;
            let key = format!("{}{}", Uuid::new_v4(), split_extension(image_type.filename()));
            (
                key.clone(),
                TargetOptions::AwsS3(AwsS3TargetOptions {
                    region: o.region,
                    key,
                    public: o.public,
                }),
            )
        }
        UploadType::Gcp => {
            let o: GcpUploadOptions = upload_options(upload_type, options)?;
            (
                key.clone(),
                TargetOptions::Gcp(GcpTargetOptions {
                    region: o.region,
                    bucket: o.bucket,
                    object: key,
                    share_with_accounts: o.share_with_accounts,
                }),
            )
        }
        UploadType::Azure => {
            let o: AzureUploadOptions = upload_options(upload_type, options)?;
            (
                o.image_name.unwrap_or(key),
                TargetOptions::AzureImage(AzureImageTargetOptions {
                    tenant_id: o.tenant_id,
                    subscription_id: o.subscription_id,
                    resource_group: o.resource_group,
                    location: o.location,
                }),
            )
        }
        UploadType::Container => {
            let o: ContainerUploadOptions = upload_options(upload_type, options)?;
            let reference = format!(
                "{}:{}",
                o.name.unwrap_or(key),
                o.tag.as_deref().unwrap_or("latest")
            );
            (
                reference.clone(),
                TargetOptions::Container(ContainerTargetOptions {
                    reference,
                    tls_verify: None,
                }),
            )
        }
        UploadType::OciObjectStorage => (
            image_type.filename().to_string(),
            TargetOptions::OciObjectStorage(OciObjectStorageTargetOptions {}),
        ),
        UploadType::PulpOstree => return Err(ComposerError::UnsupportedUploadType(upload_type)),
    };

    Ok(Target::new(image_name, artifact(image_type), options))
}

/// Decodes the options of `upload_type`
///
/// `local_save` may accompany any upload options and has been read already.
fn upload_options<T: DeserializeOwned>(
    upload_type: UploadType,
    options: &serde_json::Value,
) -> Result<T, ComposerError> {
    let mut options = options.clone();
    if let Some(fields) = options.as_object_mut() {
        fields.remove("local_save");
    }

    serde_json::from_value(options).map_err(|e| ComposerError::InvalidUploadOptions {
        upload_type,
        reason: e.to_string(),
    })
}

fn artifact(image_type: ImageType) -> OsbuildArtifact {
    OsbuildArtifact {
        export_filename: image_type.filename().to_string(),
        export_name: image_type.export_name().to_string(),
    }
}

/// Converts a repository of the request into the form the manifest job takes
fn repo_config(repo: &Repository) -> Result<RepoConfig, ComposerError> {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    let mut config = RepoConfig {
        rhsm: repo.rhsm.unwrap_or(false),
        ignore_ssl: repo.ignore_ssl,
        check_gpg: repo.check_gpg,
        check_repo_gpg: repo.check_repo_gpg,
        package_sets: repo.package_sets.clone().unwrap_or_default(),
        ..Default::default()
    };

    if let Some(baseurl) = non_empty(&repo.baseurl) {
        config.base_urls = vec![baseurl];
    } else if let Some(mirrorlist) = non_empty(&repo.mirrorlist) {
        config.mirror_list = Some(mirrorlist);
    } else if let Some(metalink) = non_empty(&repo.metalink) {
        config.metalink = Some(metalink);
    } else {
        return Err(ComposerError::InvalidRepository);
    }

    if let Some(key) = non_empty(&repo.gpgkey) {
        config.gpg_keys = vec![key];
    }
    if repo.check_gpg == Some(true) && config.gpg_keys.is_empty() {
        return Err(ComposerError::NoGpgKey);
    }

    Ok(config)
}

/// Every extension of a file name, e.g. `.tar.gz` for `image.tar.gz`
fn split_extension(filename: &str) -> String {
    let mut parts: Vec<&str> = filename.split('.').collect();
    if parts.first() == Some(&"") {
        parts.remove(0);
    }
    if parts.len() <= 1 {
        return String::new();
    }
    format!(".{}", parts[1..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{JobStore, MemoryJobStore};
    use composer_core::domain::job::JobKind;
    use composer_core::domain::worker::{
        KojiFinalizeJobResult, ManifestJobByIdResult, OsBuildJobResult,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryJobStore>, Workers, Config) {
        let store = Arc::new(MemoryJobStore::new());
        (store.clone(), Workers::new(store), Config::default())
    }

    fn request(body: serde_json::Value) -> ComposeRequest {
        serde_json::from_value(body).unwrap()
    }

    fn aws_request() -> ComposeRequest {
        request(json!({
            "distribution": "rhel-9",
            "image_request": {
                "architecture": "x86_64",
                "image_type": "aws",
                "repositories": [{ "baseurl": "http://repo/baseos" }],
                "upload_options": { "region": "us-east-1", "share_with_accounts": ["123"] }
            }
        }))
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("image.raw"), ".raw");
        assert_eq!(split_extension("image.tar.gz"), ".tar.gz");
        assert_eq!(split_extension("disk"), "");
        assert_eq!(split_extension(".bashrc"), "");
        assert_eq!(split_extension(".hidden.tar"), ".tar");
    }

    #[test]
    fn test_repo_config_prefers_baseurl() {
        let repo = Repository {
            baseurl: Some("http://base".to_string()),
            mirrorlist: Some("http://mirror".to_string()),
            gpgkey: Some("KEY".to_string()),
            check_gpg: Some(true),
            ..Default::default()
        };

        let config = repo_config(&repo).unwrap();
        assert_eq!(config.base_urls, vec!["http://base"]);
        assert_eq!(config.mirror_list, None);
        assert_eq!(config.gpg_keys, vec!["KEY"]);
        assert!(!config.rhsm);

        let repo = Repository {
            baseurl: Some(String::new()),
            metalink: Some("http://metalink".to_string()),
            ..Default::default()
        };
        assert_eq!(
            repo_config(&repo).unwrap().metalink.as_deref(),
            Some("http://metalink")
        );
    }

    #[test]
    fn test_repo_config_errors() {
        assert!(matches!(
            repo_config(&Repository::default()),
            Err(ComposerError::InvalidRepository)
        ));

        let repo = Repository {
            baseurl: Some("http://base".to_string()),
            check_gpg: Some(true),
            ..Default::default()
        };
        assert!(matches!(repo_config(&repo), Err(ComposerError::NoGpgKey)));
    }

    #[tokio::test]
    async fn test_submit_single_aws_image() {
        let (store, workers, config) = setup();

        let resp = submit_compose(&workers, &config, aws_request(), "tenant")
            .await
            .unwrap();
        let id = resp.reference.id;
        assert_eq!(resp.reference.kind, "ComposeId");
        assert_eq!(store.job_kind(id).await.unwrap(), JobKind::OsBuild);

        let build = workers.job_info::<OsBuildJobResult>(id).await.unwrap();
        assert_eq!(build.channel, "tenant");
        let job: OsBuildJob = build.args().unwrap();
        assert_eq!(job.targets.len(), 1);
        let TargetOptions::Aws(aws) = &job.targets[0].options else {
            panic!("expected an aws target, got {:?}", job.targets[0].options);
        };
        assert_eq!(aws.region, "us-east-1");
        assert_eq!(aws.share_with_accounts, vec!["123"]);
        assert!(aws.key.starts_with("composer-api-"));
        assert_eq!(job.targets[0].image_name, aws.key);
        assert_eq!(job.pipeline_names, ImageType::Aws.pipeline_names());

        let [manifest_id] = build.dependencies.as_slice() else {
            panic!("expected one dependency, got {:?}", build.dependencies);
        };
        let manifest = workers
            .job_info::<ManifestJobByIdResult>(*manifest_id)
            .await
            .unwrap();
        let args: ManifestJobById = manifest.args().unwrap();
        assert_eq!(args.image_type, "ami");
        assert_eq!(args.distribution, "rhel-9");
        assert_eq!(args.repositories[0].base_urls, vec!["http://repo/baseos"]);
        assert!(args.seed >= 0);
    }

    #[tokio::test]
    async fn test_submit_s3_key_keeps_extension() {
        let (_, workers, config) = setup();
        let req = request(json!({
            "distribution": "fedora-40",
            "image_request": {
                "architecture": "aarch64",
                "image_type": "guest-image",
                "repositories": [{ "baseurl": "http://repo" }],
                "upload_options": { "region": "eu-central-1", "public": true }
            }
        }));

        let id = submit_compose(&workers, &config, req, "").await.unwrap().reference.id;
        let job: OsBuildJob = workers
            .job_info::<OsBuildJobResult>(id)
            .await
            .unwrap()
            .args()
            .unwrap();

        let TargetOptions::AwsS3(s3) = &job.targets[0].options else {
            panic!("expected an s3 target");
        };
        assert!(s3.key.ends_with(".qcow2"));
        assert!(s3.public);
    }

    #[tokio::test]
    async fn test_payload_repositories_get_payload_package_sets() {
        let (_, workers, config) = setup();
        let req = request(json!({
            "distribution": "rhel-9",
            "customizations": {
                "packages": ["vim"],
                "payload_repositories": [{ "baseurl": "http://payload", "package_sets": ["build"] }]
            },
            "image_request": {
                "architecture": "x86_64",
                "image_type": "edge-installer",
                "repositories": [{ "baseurl": "http://repo" }],
                "upload_options": { "region": "us-east-1" }
            }
        }));

        let id = submit_compose(&workers, &config, req, "").await.unwrap().reference.id;
        let build = workers.job_info::<OsBuildJobResult>(id).await.unwrap();
        let manifest: ManifestJobById = workers
            .job_info::<ManifestJobByIdResult>(build.dependencies[0])
            .await
            .unwrap()
            .args()
            .unwrap();

        assert_eq!(manifest.repositories.len(), 2);
        assert_eq!(manifest.repositories[1].package_sets, vec!["os", "installer"]);
        assert_eq!(
            manifest.customizations.unwrap()["packages"],
            json!(["vim"])
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_requests() {
        let (_, workers, config) = setup();

        let mut req = aws_request();
        req.distribution = "debian-12".to_string();
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::UnsupportedDistribution(_)));

        let mut req = aws_request();
        req.image_requests = Some(vec![]);
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::InvalidNumberOfImageBuilds));

        let mut req = aws_request();
        req.image_request.as_mut().unwrap().architecture = "riscv64".to_string();
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::UnsupportedArchitecture(_)));

        let mut req = aws_request();
        req.image_request.as_mut().unwrap().upload_options = None;
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::MissingUploadTarget));

        let mut req = aws_request();
        req.image_request.as_mut().unwrap().upload_options =
            Some(json!({ "region": "us-east-1", "public": true }));
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(
            err,
            ComposerError::InvalidUploadOptions { upload_type: UploadType::Aws, .. }
        ));
    }

    #[tokio::test]
    async fn test_upload_options_accept_local_save_off() {
        let (_, workers, config) = setup();
        let mut req = aws_request();
        req.image_request.as_mut().unwrap().upload_options =
            Some(json!({ "region": "eu-west-1", "local_save": false }));

        let id = submit_compose(&workers, &config, req, "").await.unwrap().reference.id;
        let job: OsBuildJob = workers
            .job_info::<OsBuildJobResult>(id)
            .await
            .unwrap()
            .args()
            .unwrap();
        assert!(matches!(&job.targets[0].options, TargetOptions::Aws(o) if o.region == "eu-west-1"));

        // other unknown fields are still rejected
        let mut req = aws_request();
        req.image_request.as_mut().unwrap().upload_options =
            Some(json!({ "region": "eu-west-1", "public": true }));
        let err = submit_compose(&workers, &config, req, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::InvalidUploadOptions { upload_type: UploadType::Aws, .. }));
    }

    #[tokio::test]
    async fn test_local_save_requires_config_flag() {
        let (_, workers, mut config) = setup();
        let mut req = aws_request();
        req.image_request.as_mut().unwrap().upload_options = Some(json!({ "local_save": true }));

        let err = submit_compose(&workers, &config, req.clone(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::LocalSaveNotEnabled));

        config.local_save = true;
        let id = submit_compose(&workers, &config, req, "").await.unwrap().reference.id;
        let job: OsBuildJob = workers
            .job_info::<OsBuildJobResult>(id)
            .await
            .unwrap()
            .args()
            .unwrap();
        assert_eq!(job.targets[0].image_name, "image.raw");
        assert!(matches!(job.targets[0].options, TargetOptions::WorkerServer(_)));
    }

    #[tokio::test]
    async fn test_submit_koji_compose() {
        let (store, workers, config) = setup();
        let req = request(json!({
            "distribution": "rhel-9",
            "koji": { "server": "https://koji", "task_id": 42, "name": "img", "version": "1", "release": "2" },
            "image_requests": [
                { "architecture": "x86_64", "image_type": "guest-image", "repositories": [{ "baseurl": "http://r" }] },
                { "architecture": "aarch64", "image_type": "aws", "repositories": [{ "baseurl": "http://r" }] }
            ]
        }));

        let finalize_id = submit_compose(&workers, &config, req, "").await.unwrap().reference.id;
        assert_eq!(store.job_kind(finalize_id).await.unwrap(), JobKind::KojiFinalize);

        let finalize = workers
            .job_info::<KojiFinalizeJobResult>(finalize_id)
            .await
            .unwrap();
        let chain = KojiChain::from_finalize(finalize_id, &finalize.dependencies).unwrap();
        assert_eq!(store.job_kind(chain.init).await.unwrap(), JobKind::KojiInit);
        assert_eq!(chain.builds().len(), 2);

        let args: KojiFinalizeJob = finalize.args().unwrap();
        assert_eq!(
            args.koji_filenames,
            vec!["img-1-2.x86_64.qcow2", "img-1-2.aarch64.raw"]
        );
        assert_eq!(args.task_id, 42);
        assert!(args.koji_directory.starts_with("osbuild-cg/osbuild-composer-koji-"));

        let mut seeds = Vec::new();
        for (build_id, filename) in chain.builds().iter().zip(&args.koji_filenames) {
            let build = workers.job_info::<OsBuildJobResult>(*build_id).await.unwrap();
            assert_eq!(build.dependencies.len(), 2);
            assert_eq!(build.dependencies[0], chain.init);

            let job: OsBuildJob = build.args().unwrap();
            let [target] = job.targets.as_slice() else {
                panic!("expected only the koji target");
            };
            assert_eq!(&target.image_name, filename);
            assert!(matches!(&target.options, TargetOptions::Koji(k) if k.upload_directory == args.koji_directory));

            let manifest: ManifestJobById = workers
                .job_info::<ManifestJobByIdResult>(build.dependencies[1])
                .await
                .unwrap()
                .args()
                .unwrap();
            seeds.push(manifest.seed);
        }
        assert_eq!(seeds[0], seeds[1]);
    }
}
