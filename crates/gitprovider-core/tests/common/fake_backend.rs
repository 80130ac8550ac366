//! In-memory backend that counts every call.
//!
//! One `FakeBackend` per test; clones share the same store so a test can
//! inspect state and counters after handing the client to the engine.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gitprovider_core::{
    collect_all, validate_and_default_info, DefaultedInfoRequest, DeployKeyClient, DeployKeyInfo,
    Error, OrgRepositoriesClient, OrgRepositoryRef, Organization, OrganizationRef,
    OrganizationsClient, Page, RepositoryCreateOptions, RepositoryInfo, RepositoryRef,
    ResourceClient, ResourceObject, Result, TeamAccessClient, TeamAccessInfo,
};

/// Items per page served by `list`.
pub const PAGE_SIZE: usize = 10;

/// Counters for calls that reached the fake backend.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub gets: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub pages: AtomicUsize,
}

impl CallCounts {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    /// Every call that reached the backend.
    pub fn total(&self) -> usize {
        self.gets() + self.creates() + self.updates() + self.deletes() + self.pages()
    }

    /// Calls that changed backend state.
    pub fn writes(&self) -> usize {
        self.creates() + self.updates() + self.deletes()
    }
}

/// Server-side record. `id` and `revision` stand in for status fields the
/// info projection never carries.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeRecord<I> {
    pub id: u64,
    pub revision: u64,
    pub info: I,
}

#[derive(Debug)]
struct Store<K, I> {
    records: Vec<(K, FakeRecord<I>)>,
    next_id: u64,
}

impl<K: PartialEq, I> Store<K, I> {
    fn find(&self, key: &K) -> Option<&FakeRecord<I>> {
        self.records.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut FakeRecord<I>> {
        self.records.iter_mut().find(|(k, _)| k == key).map(|(_, r)| r)
    }
}

/// Shared state: records keyed by `K` plus call counters.
#[derive(Debug)]
pub struct FakeBackend<K, I> {
    store: Arc<Mutex<Store<K, I>>>,
    calls: Arc<CallCounts>,
    repository: RepositoryRef,
}

impl<K, I> Clone for FakeBackend<K, I> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            calls: self.calls.clone(),
            repository: self.repository.clone(),
        }
    }
}

impl<K, I> FakeBackend<K, I>
where
    K: PartialEq + Clone + Debug + Send + Sync + 'static,
    I: DefaultedInfoRequest,
{
    pub fn new(repository: RepositoryRef) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                records: Vec::new(),
                next_id: 1,
            })),
            calls: Arc::new(CallCounts::default()),
            repository,
        }
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Insert a record directly, bypassing the counters.
    pub fn seed(&self, key: K, info: I) {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id;
        store.next_id += 1;
        store.records.push((
            key,
            FakeRecord {
                id,
                revision: 1,
                info,
            },
        ));
    }

    /// Change a record behind the client's back.
    pub fn mutate_externally(&self, key: &K, f: impl FnOnce(&mut I)) {
        let mut store = self.store.lock().unwrap();
        if let Some(record) = store.find_mut(key) {
            f(&mut record.info);
            record.revision += 1;
        }
    }

    pub fn record(&self, key: &K) -> Option<FakeRecord<I>> {
        self.store.lock().unwrap().find(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().records.len()
    }

    fn resource(&self, key: K, record: FakeRecord<I>) -> FakeResource<K, I> {
        FakeResource {
            backend: self.clone(),
            key,
            record,
        }
    }

    fn fetch(&self, key: &K) -> Result<FakeResource<K, I>> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        let record = self
            .store
            .lock()
            .unwrap()
            .find(key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{:?}", key)))?;
        Ok(self.resource(key.clone(), record))
    }

    fn insert(&self, key: &K, desired: I) -> Result<FakeResource<K, I>> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        let desired = validate_and_default_info(desired)?;

        let mut store = self.store.lock().unwrap();
        if store.find(key).is_some() {
            return Err(Error::already_exists(format!("{:?}", key)));
        }
        let id = store.next_id;
        store.next_id += 1;
        let record = FakeRecord {
            id,
            revision: 1,
            info: desired,
        };
        store.records.push((key.clone(), record.clone()));
        drop(store);

        Ok(self.resource(key.clone(), record))
    }

    /// Serve one page of records matching `filter`; the cursor is the page index.
    fn page(
        &self,
        cursor: Option<String>,
        filter: impl Fn(&K) -> bool,
    ) -> Result<Page<FakeResource<K, I>>> {
        self.calls.pages.fetch_add(1, Ordering::SeqCst);
        let index: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("bad cursor {}", c)))?,
            None => 0,
        };

        let matching: Vec<(K, FakeRecord<I>)> = self
            .store
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();

        let start = index * PAGE_SIZE;
        let items = matching
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|(k, r)| self.resource(k.clone(), r.clone()))
            .collect();
        let next = (start + PAGE_SIZE < matching.len()).then(|| (index + 1).to_string());

        Ok(Page::new(items, next))
    }
}

/// Resource object handed out by the fake backend.
#[derive(Debug)]
pub struct FakeResource<K, I> {
    backend: FakeBackend<K, I>,
    key: K,
    record: FakeRecord<I>,
}

impl<K, I> FakeResource<K, I> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

#[async_trait]
impl<K, I> ResourceObject for FakeResource<K, I>
where
    K: PartialEq + Clone + Debug + Send + Sync + 'static,
    I: DefaultedInfoRequest,
{
    type Info = I;
    type Native = FakeRecord<I>;

    fn repository(&self) -> &RepositoryRef {
        &self.backend.repository
    }

    fn get(&self) -> I {
        self.record.info.clone()
    }

    fn set(&mut self, info: I) -> Result<()> {
        info.validate_info()?;
        self.record.info = info;
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        self.backend.calls.updates.fetch_add(1, Ordering::SeqCst);
        let mut store = self.backend.store.lock().unwrap();
        let record = store
            .find_mut(&self.key)
            .ok_or_else(|| Error::not_found(format!("{:?}", self.key)))?;
        record.info = self.record.info.clone();
        record.revision += 1;
        self.record = record.clone();
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.backend.calls.deletes.fetch_add(1, Ordering::SeqCst);
        let mut store = self.backend.store.lock().unwrap();
        let position = store
            .records
            .iter()
            .position(|(k, _)| k == &self.key)
            .ok_or_else(|| Error::not_found(format!("{:?}", self.key)))?;
        store.records.remove(position);
        Ok(())
    }

    fn api_object(&self) -> &FakeRecord<I> {
        &self.record
    }
}

// =============================================================================
// Client impls
// =============================================================================

/// Client over a fake backend.
#[derive(Debug, Clone)]
pub struct FakeClient<K, I> {
    pub backend: FakeBackend<K, I>,
}

#[async_trait]
impl ResourceClient for FakeClient<OrgRepositoryRef, RepositoryInfo> {
    type Ref = OrgRepositoryRef;
    type Info = RepositoryInfo;
    type Resource = FakeResource<OrgRepositoryRef, RepositoryInfo>;
    type CreateOptions = RepositoryCreateOptions;

    async fn get(&self, reference: &OrgRepositoryRef) -> Result<Self::Resource> {
        self.backend.fetch(reference)
    }

    async fn create(
        &self,
        reference: &OrgRepositoryRef,
        desired: RepositoryInfo,
        _options: RepositoryCreateOptions,
    ) -> Result<Self::Resource> {
        self.backend.insert(reference, desired)
    }
}

#[async_trait]
impl OrgRepositoriesClient for FakeClient<OrgRepositoryRef, RepositoryInfo> {
    async fn list(&self, organization: &OrganizationRef) -> Result<Vec<Self::Resource>> {
        collect_all(|cursor| async move {
            self.backend
                .page(cursor, |key: &OrgRepositoryRef| &key.organization == organization)
        })
        .await
    }
}

macro_rules! named_fake_client {
    ($info:ty, $trait:ident) => {
        #[async_trait]
        impl ResourceClient for FakeClient<String, $info> {
            type Ref = String;
            type Info = $info;
            type Resource = FakeResource<String, $info>;
            type CreateOptions = ();

            async fn get(&self, name: &String) -> Result<Self::Resource> {
                self.backend.fetch(name)
            }

            async fn create(
                &self,
                name: &String,
                desired: $info,
                _options: (),
            ) -> Result<Self::Resource> {
                self.backend.insert(name, desired)
            }
        }

        #[async_trait]
        impl $trait for FakeClient<String, $info> {
            async fn list(&self) -> Result<Vec<Self::Resource>> {
                collect_all(|cursor| async move { self.backend.page(cursor, |_| true) }).await
            }
        }
    };
}

named_fake_client!(TeamAccessInfo, TeamAccessClient);
named_fake_client!(DeployKeyInfo, DeployKeyClient);

/// Fixed set of organizations.
#[derive(Debug, Clone, Default)]
pub struct FakeOrganizations {
    pub organizations: Vec<Organization>,
    pub calls: Arc<CallCounts>,
}

impl FakeOrganizations {
    pub fn with(references: impl IntoIterator<Item = OrganizationRef>) -> Self {
        Self {
            organizations: references
                .into_iter()
                .map(|reference| Organization {
                    name: Some(reference.leaf_name().to_string()),
                    reference,
                    description: None,
                })
                .collect(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl OrganizationsClient for FakeOrganizations {
    async fn get(&self, organization: &OrganizationRef) -> Result<Organization> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        self.organizations
            .iter()
            .find(|o| &o.reference == organization)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("organization {}", organization)))
    }

    async fn list(&self) -> Result<Vec<Organization>> {
        self.calls.pages.fetch_add(1, Ordering::SeqCst);
        Ok(self.organizations.clone())
    }

    async fn children(&self, organization: &OrganizationRef) -> Result<Vec<Organization>> {
        self.calls.pages.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .organizations
            .iter()
            .filter(|o| {
                let subs = &o.reference.sub_organizations;
                o.reference.domain == organization.domain
                    && o.reference.organization == organization.organization
                    && subs.len() == organization.sub_organizations.len() + 1
                    && subs.starts_with(&organization.sub_organizations)
            })
            .cloned()
            .collect())
    }
}
