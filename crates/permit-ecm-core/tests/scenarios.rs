//! End-to-end attachment runs through the in-memory collaborators.

use std::sync::Arc;

use permit_ecm_core::category::{permit, tax_account, CategoryKind};
use permit_ecm_core::ecm::memory::InMemoryContentServer;
use permit_ecm_core::models::{AttachmentMetadata, FileContent, FolderLink, PermitRow, TaxRow};
use permit_ecm_core::source::memory::InMemoryMetadataSource;
use permit_ecm_core::{AttachmentService, CategoryIds, Error, FolderLayout, Labels};

const IDS: CategoryIds = CategoryIds {
    document_info: 31001,
    permit: 31002,
    tax_account: 31003,
};

const ATTACHMENT: i64 = 8801;

fn link() -> FolderLink {
    FolderLink {
        folder_type: "BLD".into(),
        section: "00".into(),
        revision: "00".into(),
        sequence: "101234".into(),
        year: "24".into(),
    }
}

fn permit_row(number: &str) -> PermitRow {
    PermitRow {
        permit_type: "BLD".into(),
        permit_type_description: "Building".into(),
        permit_number: number.into(),
        folder_name: "Smith Residence".into(),
        folder_key: "555".into(),
        location: "123 Main St".into(),
        contact: "Owner: Jane Smith".into(),
        ..Default::default()
    }
}

struct Harness {
    server: Arc<InMemoryContentServer>,
    source: Arc<InMemoryMetadataSource>,
    layout: FolderLayout,
}

impl Harness {
    fn new() -> Self {
        let server = Arc::new(InMemoryContentServer::new().with_schema_templates(&IDS));
        let root = server.add_root("Enterprise");
        server.ensure_path(root.id, &["Permits", "Tax Accounts"]);
        server.ensure_path(root.id, &["Permits", "No Tax Account"]);

        let source = Arc::new(InMemoryMetadataSource::new());
        source.insert_attachment(
            ATTACHMENT,
            AttachmentMetadata {
                source: "AMANDA Attachment".into(),
                description: "Foundation inspection photos".into(),
                kind: "Inspection".into(),
            },
            Some(link()),
        );

        Self {
            server,
            source,
            layout: FolderLayout {
                workspace_root_id: root.id,
                tax_account_path: vec!["Permits".into(), "Tax Accounts".into()],
                no_tax_account_path: vec!["Permits".into(), "No Tax Account".into()],
            },
        }
    }

    async fn service(&self) -> AttachmentService {
        AttachmentService::start(
            self.source.clone(),
            self.server.clone(),
            &IDS,
            self.layout.clone(),
            Labels::default(),
        )
        .await
        .unwrap()
    }

    fn root(&self, name: &str) -> permit_ecm_core::models::FolderNode {
        let permits = self
            .server
            .children(self.layout.workspace_root_id)
            .into_iter()
            .find(|n| n.name == "Permits")
            .unwrap();
        self.server
            .children(permits.id)
            .into_iter()
            .find(|n| n.name == name)
            .unwrap()
    }
}

#[tokio::test]
async fn scenario_a_no_tax_account() {
    let h = Harness::new();
    h.source.insert_permits(link(), vec![permit_row("P-100")]);
    let svc = h.service().await;

    let id = svc
        .put_attachment(ATTACHMENT, None, FileContent::from_bytes("photos.zip", vec![3; 2048]))
        .await
        .unwrap();

    let no_tax_root = h.root("No Tax Account");
    let folders = h.server.children(no_tax_root.id);
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, "P-100");

    let docs = h.server.children(folders[0].id);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, id);
    assert_eq!(docs[0].name, format!("{}_photos.zip", ATTACHMENT));

    let version = &h.server.versions(id)[0];
    assert_eq!(version.bytes.len(), 2048);
    assert_eq!(version.attributes.file_name, "photos.zip");
    assert_eq!(version.attributes.size, 2048);
    assert!(version.metadata.group(CategoryKind::TaxAccount).is_none());
    assert!(h.server.children(h.root("Tax Accounts").id).is_empty());
}

#[tokio::test]
async fn scenario_b_related_permits_and_tax_account() {
    let h = Harness::new();
    h.source.insert_permits(
        link(),
        vec![permit_row("P-100"), permit_row("P-200"), permit_row("P-300")],
    );
    h.source.insert_parcels(555, vec!["00401200300100".into()]);
    h.source.insert_tax_rows(
        "00401200300100",
        vec![TaxRow {
            alternate_tax_id: "R-1".into(),
            address: "123 Main St".into(),
            city: "Everett".into(),
            zip: "98201-4321".into(),
        }],
    );
    let svc = h.service().await;

    let id = svc
        .put_attachment(ATTACHMENT, None, FileContent::from_bytes("plan.pdf", vec![1; 10]))
        .await
        .unwrap();

    let tax_folders = h.server.children(h.root("Tax Accounts").id);
    assert_eq!(tax_folders.len(), 1);
    assert_eq!(tax_folders[0].name, "00401200300100");
    let permit_folders = h.server.children(tax_folders[0].id);
    assert_eq!(permit_folders[0].name, "P-100");

    let metadata = &h.server.versions(id)[0].metadata;
    let kinds: Vec<CategoryKind> = metadata.groups.iter().map(|g| g.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CategoryKind::TaxAccount,
            CategoryKind::Permit,
            CategoryKind::DocumentInfo
        ]
    );
    let permit_set = metadata.group(CategoryKind::Permit).unwrap();
    assert_eq!(
        permit_set.values(permit::RELATED_PERMITS).unwrap(),
        &["P-200".to_string(), "P-300".to_string()]
    );
    let tax = metadata.group(CategoryKind::TaxAccount).unwrap();
    assert_eq!(tax.first(tax_account::ZIP), Some("98201"));
}

#[tokio::test]
async fn scenario_c_zero_byte_file_rejected_before_upload() {
    let h = Harness::new();
    h.source.insert_permits(link(), vec![permit_row("P-100")]);
    let svc = h.service().await;

    let err = svc
        .put_attachment(ATTACHMENT, None, FileContent::from_bytes("empty.txt", Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    let calls = h.server.calls();
    assert_eq!(calls.document_creates, 0);
    assert_eq!(calls.version_adds, 0);
    assert_eq!(calls.uploads, 0);
}

#[tokio::test]
async fn scenario_d_add_version_returns_original_id() {
    let h = Harness::new();
    h.source.insert_permits(link(), vec![permit_row("P-100")]);
    let svc = h.service().await;

    let original = svc
        .put_attachment(ATTACHMENT, None, FileContent::from_bytes("plan.pdf", vec![1; 5]))
        .await
        .unwrap();
    let returned = svc
        .put_attachment(
            ATTACHMENT,
            Some(original),
            FileContent::from_bytes("plan-v2.pdf", vec![2; 30_000]),
        )
        .await
        .unwrap();

    assert_eq!(returned, original);
    let versions = h.server.versions(original);
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].bytes.len(), 30_000);

    let calls = h.server.calls();
    assert_eq!(calls.document_creates, 1);
    assert_eq!(calls.version_adds, 1);
    assert_eq!(calls.folder_creates, 1);
    // 5 bytes in one frame, 30 000 bytes in three.
    assert_eq!(calls.chunks, 4);
}

#[tokio::test]
async fn folder_resolution_failure_names_the_attachment() {
    let h = Harness::new();
    let svc = h.service().await;

    let err = svc
        .put_attachment(ATTACHMENT, None, FileContent::from_bytes("plan.pdf", vec![1]))
        .await
        .unwrap_err();

    match &err {
        Error::FolderResolution { attachment_id, .. } => assert_eq!(*attachment_id, ATTACHMENT),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.is_not_found());
}

#[tokio::test]
async fn missing_related_tax_rows_falls_back_to_no_tax_branch() {
    let h = Harness::new();
    h.source.insert_permits(link(), vec![permit_row("P-100")]);
    h.source
        .insert_parcels(555, vec!["111".into(), "222".into()]);
    h.source.insert_tax_rows("111", vec![TaxRow::default()]);
    let svc = h.service().await;

    svc.put_attachment(ATTACHMENT, None, FileContent::from_bytes("a.pdf", vec![1]))
        .await
        .unwrap();

    assert_eq!(h.server.children(h.root("No Tax Account").id).len(), 1);
    assert!(h.server.children(h.root("Tax Accounts").id).is_empty());
}
