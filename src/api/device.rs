use log::{debug, info};

use super::ApiEndpoint;
use crate::models::device::{DeviceFilters, RawDevice};
use crate::{DnacClient, DnacError, DnacResult};

const DEVICE_COUNT_ENDPOINT: &str = "/dna/intent/api/v1/network-device/count";
const DEVICE_LIST_ENDPOINT: &str = "/dna/intent/api/v1/network-device";

/// Default number of records requested per device list page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Provides access to the DNA Center network device inventory.
pub struct DeviceApi<'a> {
    client: &'a DnacClient,
}

impl<'a> ApiEndpoint for DeviceApi<'a> {
    fn client(&self) -> &DnacClient {
        self.client
    }
}

impl<'a> DeviceApi<'a> {
    /// Creates a new device API instance.
    ///
    /// This method is intended for internal use by the DNA Center client.
    pub(crate) fn new(client: &'a DnacClient) -> Self {
        Self { client }
    }

    /// Returns the total number of devices managed by the controller.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::FetchError` if the count query fails.
    pub async fn count(&self) -> DnacResult<u64> {
        self.client()
            .get(DEVICE_COUNT_ENDPOINT, &[])
            .await
            .map_err(|e| DnacError::fetch("Getting device count", e))
    }

    /// Fetches a single page of the device list.
    ///
    /// `offset` is the 1-based index of the first record, following the
    /// controller's convention.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::FetchError` if the page query fails.
    pub async fn page(
        &self,
        filters: &DeviceFilters,
        limit: u32,
        offset: u64,
    ) -> DnacResult<Vec<RawDevice>> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        query.extend(filters.query_pairs());

        self.client()
            .get(DEVICE_LIST_ENDPOINT, &query)
            .await
            .map_err(|e| DnacError::fetch("Getting device inventory", e))
    }

    /// Collects the complete, filtered device inventory.
    ///
    /// Issues one count query, then `ceil(count / page_size)` sequential page
    /// queries. Records keep the controller's order within and across pages.
    /// A failing page aborts the whole collection.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(client: &dnac_inventory::DnacClient) -> dnac_inventory::DnacResult<()> {
    /// use dnac_inventory::DeviceFilters;
    ///
    /// let filters = DeviceFilters {
    ///     device_family: vec!["Routers".into()],
    ///     ..Default::default()
    /// };
    /// let devices = client.devices().collect(&filters, 500).await?;
    /// println!("{} routers", devices.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn collect(
        &self,
        filters: &DeviceFilters,
        page_size: u32,
    ) -> DnacResult<Vec<RawDevice>> {
        if page_size == 0 {
            return Err(DnacError::ConfigurationError(
                "Device page size must be greater than zero".into(),
            ));
        }

        let total = self.count().await?;
        let pages = page_count(total, page_size);
        info!("Collecting {total} devices in {pages} page(s) of {page_size}");

        let mut devices = Vec::new();
        for index in 0..pages {
            let offset = page_offset(index, page_size);
            let page = self.page(filters, page_size, offset).await?;
            debug!("Device page {} (offset {offset}) returned {} records", index + 1, page.len());
            devices.extend(page);
        }

        Ok(devices)
    }
}

/// Number of pages needed to cover `total` records.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size))
}

/// 1-based offset of the first record on page `index` (0-based).
pub fn page_offset(index: u64, page_size: u32) -> u64 {
    index * u64::from(page_size) + 1
}
