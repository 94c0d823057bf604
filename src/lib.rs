/*!
# Claims Portal

Marketing site and internal dashboards for an insurance-claim consulting
business, built in Rust.

## Overview

The dashboards read their data from a publicly shared spreadsheet. Every page
load fetches the relevant tab as CSV, parses it into rows keyed by the header
line, and maps the rows onto typed records with heuristic normalizers. Staff
reminders (follow-ups and updates) are kept in a small local key-value store.

## Architecture

### Data Layer
- **Sheet Loader** (`sheets`) - Builds export URLs, fetches CSV, detects HTML
  error pages served as success, parses rows, and on failure asks the JSON
  export for diagnostics
- **Normalizers** (`normalize`) - Financial metrics, process stages, to-dos and
  adjuster meetings, project listings
- **Reminder Store** (`reminders`) - Follow-up and update notes over a
  key-value store (JSON file or memory)

### Service Layer
- **Dashboard pipelines** (`dashboard`) - Fetch, parse and normalize per
  dashboard, parameterized by tenant
- **Refresh ordering** (`refresh`) - Generation tokens so the latest refresh wins
- **Gates** (`login`) - Argon2-hashed dashboard passwords and server-side sessions
- **Web** (`app`) - axum routes for the landing page, login and JSON API

## Modules

- **config**: Portal and tenant configuration (JSON file)
- **error**: Loader and store errors
- **sheets**: Sheet loading and CSV parsing
- **normalize**: Record normalizers and currency formatting
- **reminders**: Reminder store
- **refresh**: Last-intent-wins dashboard views
- **dashboard**: Fetch-parse-normalize pipelines
- **documents**: Generated document file names
- **login**: Dashboard gates (feature `web`)
- **app**: Router and server (feature `web`)

## REST API Endpoints

- `/api/tenants/{tenant}/financials` - Headline numbers, raw and formatted
- `/api/tenants/{tenant}/projects` - Project listing
- `/api/tenants/{tenant}/projects/{id}` - One project
- `/api/stages` - Process stages
- `/api/tasks` - To-dos and adjuster meetings
- `/api/reminders/{follow-ups|updates}` - List (GET) and add (POST) reminders
- `/api/reminders/{kind}/{id}` - Delete a reminder
*/

pub mod config;
pub mod dashboard;
pub mod documents;
pub mod error;
pub mod normalize;
pub mod refresh;
pub mod reminders;
pub mod sheets;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;

pub use config::{PortalConfig, SheetRef, TenantConfig};
pub use error::{SheetError, StoreError};
pub use sheets::{Row, SheetLoader};
