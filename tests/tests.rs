// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod conversion;
mod evaluation;
