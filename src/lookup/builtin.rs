// Issuer domicile for instruments commonly held through the broker. ADRs map
// to the country of the underlying company, not the depositary.

pub(super) const ISIN_COUNTRIES: &[(&str, &str)] = &[
    ("CH0012221716", "CH"),
    ("US0028241000", "US"),
    ("LU0584671464", "LU"),
    ("DE000A1EWWW0", "DE"),
    ("FR0000120073", "FR"),
    ("NL0000235190", "NL"),
    ("US00162Q4525", "US"),
    ("DE0008404005", "DE"),
    ("US02364W1053", "MX"),
    ("BE0974293251", "BE"),
    ("US0378331005", "US"),
    ("NL0010273215", "NL"),
    ("GB0009895292", "GB"),
    ("FR0000120628", "FR"),
    ("US0594603039", "BR"),
    ("US05967A1079", "BR"),
    ("US05964H1059", "ES"),
    ("DE000BASF111", "DE"),
    ("DE000BAY0017", "DE"),
    ("US0758871091", "US"),
    ("FR0000131104", "FR"),
    ("GB0007980591", "GB"),
    ("US4642864007", "US"),
    ("US15234Q2075", "BR"),
    ("CH0044328745", "CH"),
    ("US20441A1025", "BR"),
    ("US20440W1053", "BR"),
    ("CH0210483332", "CH"),
    ("US2044096012", "BR"),
    ("BMG2519Y1084", "PE"),
    ("DE0005552004", "DE"),
    ("DE0005557508", "DE"),
    ("US5324571083", "US"),
    ("US81369Y5069", "US"),
    ("PR3186727065", "US"),
    ("US3444191064", "MX"),
    ("US3737371050", "BR"),
    ("ES0144580Y14", "ES"),
    ("ES0148396007", "ES"),
    ("DE0006231004", "DE"),
    ("NL0011821202", "NL"),
    ("US4581401001", "US"),
    ("US46434V6213", "US"),
    ("US46434V7385", "US"),
    ("US4642866085", "US"),
    ("US4642868065", "US"),
    ("US46434G8226", "US"),
    ("US4642868222", "US"),
    ("US4642868149", "US"),
    ("US4642867497", "US"),
    ("US46434G7723", "US"),
    ("US4655621062", "BR"),
    ("US4781601046", "US"),
    ("FR0000121485", "FR"),
    ("ES0157097017", "ES"),
    ("IE00BZ12WP82", "GB"),
    ("FR0000121014", "FR"),
    ("IE00BTN1Y115", "IE"),
    ("DE0007100000", "DE"),
    ("US58933Y1055", "US"),
    ("US5949181045", "US"),
    ("CH0038863350", "CH"),
    ("US66987V1098", "CH"),
    ("US6701002056", "DK"),
    ("US67066G1040", "US"),
    ("NL0009538784", "NL"),
    ("US71654V1017", "BR"),
    ("PR7331747001", "US"),
    ("US7475251036", "US"),
    ("CH0012032048", "CH"),
    ("FR0000120578", "FR"),
    ("DE0007164600", "DE"),
    ("FR0000121972", "FR"),
    ("US8085247976", "US"),
    ("GB00BP6MXD84", "GB"),
    ("DE0007236101", "DE"),
    ("US8336351056", "CL"),
    ("US84265V1052", "US"),
    ("US78464A6982", "US"),
    ("NL00150001Q9", "NL"),
    ("US86959K1051", "BR"),
    ("US87936R2058", "BR"),
    ("US8808901081", "LU"),
    ("FR0000120271", "FR"),
    ("CH0244767585", "CH"),
    ("US81369Y8865", "US"),
    ("US91912E1055", "BR"),
    ("US9220428745", "US"),
    ("DE0007664039", "DE"),
    ("CA9628791027", "CA"),
    ("CA98462Y1007", "CA"),
    ("CH0011075394", "CH"),
];
